// ── Fallback cascade resolver ──
//
// Walks the endpoint candidates for a device class, most specific first,
// skipping endpoints the capability store already knows are missing.
// "Endpoint unsupported" is absorbed here: it updates the store and moves
// on. Every other failure propagates unchanged.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use loggamera_api::models::DeviceData;
use loggamera_api::{
    DeviceClass, DeviceId, Endpoint, HttpTransport, LoggameraClient, Outcome, Transport,
};
use serde::Serialize;
use strum::Display;
use tracing::{debug, info, warn};

use crate::capability::{CapabilityStatus, CapabilityStore};
use crate::error::CoreError;
use crate::model::{Capabilities, CanonicalSensorValue};
use crate::normalize::SensorNormalizer;
use crate::scope::RequestContext;

/// What the caller wants from a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Intent {
    /// All current readings.
    Readings,
    /// Alarm flags, alarm descriptions and status indicators only.
    AlarmStatus,
}

/// Why a candidate endpoint did not produce the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AttemptOutcome {
    /// Known unavailable; no request was made.
    Skipped,
    /// The platform said the endpoint does not exist for this device.
    Unsupported(String),
    /// The endpoint answered without usable values.
    NoData,
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skipped => f.write_str("skipped"),
            Self::Unsupported(message) => write!(f, "unsupported ({message})"),
            Self::NoData => f.write_str("no data"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointAttempt {
    pub endpoint: Endpoint,
    pub outcome: AttemptOutcome,
}

impl fmt::Display for EndpointAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.endpoint, self.outcome)
    }
}

/// Values produced by a successful cascade.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    /// Endpoint the primary values came from.
    pub source: Endpoint,
    pub values: Vec<CanonicalSensorValue>,
    /// Candidates tried (or skipped) before `source`.
    pub attempts: Vec<EndpointAttempt>,
}

/// Candidate endpoints for `class`, in the order they are tried.
pub fn candidates(class: &DeviceClass, intent: Intent) -> Vec<Endpoint> {
    match intent {
        Intent::Readings => class
            .dedicated_endpoint()
            .into_iter()
            .chain([Endpoint::RawData, Endpoint::GenericDevice])
            .collect(),
        Intent::AlarmStatus => vec![Endpoint::GenericDevice, Endpoint::RawData],
    }
}

// ── Resolver ────────────────────────────────────────────────────────

pub struct CascadeResolver<T = HttpTransport> {
    client: LoggameraClient<T>,
    store: Arc<dyn CapabilityStore>,
    normalizer: SensorNormalizer,
}

impl<T> Clone for CascadeResolver<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            store: Arc::clone(&self.store),
            normalizer: self.normalizer.clone(),
        }
    }
}

impl<T: Transport> CascadeResolver<T> {
    pub fn new(
        client: LoggameraClient<T>,
        store: Arc<dyn CapabilityStore>,
        normalizer: SensorNormalizer,
    ) -> Self {
        Self {
            client,
            store,
            normalizer,
        }
    }

    pub fn client(&self) -> &LoggameraClient<T> {
        &self.client
    }

    pub fn store(&self) -> &Arc<dyn CapabilityStore> {
        &self.store
    }

    /// Read canonical values for one device.
    ///
    /// Requests are scoped to the context's current organization and
    /// observe its cancellation token.
    pub async fn resolve(
        &self,
        ctx: &RequestContext,
        class: &DeviceClass,
        device_id: DeviceId,
        intent: Intent,
    ) -> Result<Resolved, CoreError> {
        let mut attempts = Vec::new();

        if intent == Intent::Readings {
            if let Some(missing) = class.missing_endpoint() {
                if self.store.lookup(class, missing) != CapabilityStatus::Unavailable {
                    info!(
                        device_class = %class,
                        endpoint = %missing,
                        "endpoint not implemented by the platform, marking unavailable"
                    );
                    self.store.record(class, missing, CapabilityStatus::Unavailable);
                }
                attempts.push(EndpointAttempt {
                    endpoint: missing,
                    outcome: AttemptOutcome::Skipped,
                });
            }
        }

        for endpoint in candidates(class, intent) {
            if self.store.lookup(class, endpoint) == CapabilityStatus::Unavailable {
                debug!(
                    device_class = %class,
                    %endpoint,
                    %device_id,
                    "skipping unavailable endpoint"
                );
                attempts.push(EndpointAttempt {
                    endpoint,
                    outcome: AttemptOutcome::Skipped,
                });
                continue;
            }

            let data = match self.fetch(ctx, endpoint, device_id).await? {
                Outcome::Success(data) => data,
                Outcome::Unsupported { message } => {
                    info!(
                        device_class = %class,
                        %endpoint,
                        %device_id,
                        reason = %message,
                        "endpoint unsupported, marking unavailable"
                    );
                    self.store.record(class, endpoint, CapabilityStatus::Unavailable);
                    attempts.push(EndpointAttempt {
                        endpoint,
                        outcome: AttemptOutcome::Unsupported(message),
                    });
                    continue;
                }
            };

            let mut values = self.normalizer.normalize(class, endpoint, &data, Utc::now());
            if !values.is_empty() {
                self.store.record(class, endpoint, CapabilityStatus::Available);
            }
            if intent == Intent::AlarmStatus {
                values.retain(CanonicalSensorValue::is_alarm_or_status);
            }
            if values.is_empty() {
                debug!(device_class = %class, %endpoint, %device_id, "endpoint returned no values");
                attempts.push(EndpointAttempt {
                    endpoint,
                    outcome: AttemptOutcome::NoData,
                });
                continue;
            }

            if intent == Intent::Readings
                && endpoint == Endpoint::RawData
                && class.dedicated_endpoint().is_none()
            {
                self.supplement(ctx, class, device_id, &mut values).await?;
            }

            debug!(
                device_class = %class,
                %endpoint,
                %device_id,
                count = values.len(),
                "resolved device values"
            );
            return Ok(Resolved {
                source: endpoint,
                values,
                attempts,
            });
        }

        warn!(device_class = %class, %device_id, "no endpoint returned data");
        Err(CoreError::AllEndpointsExhausted {
            device_id,
            attempts,
        })
    }

    /// Merge alarm and status values from `GenericDevice` that `RawData`
    /// did not report. Only cancellation fails the caller.
    async fn supplement(
        &self,
        ctx: &RequestContext,
        class: &DeviceClass,
        device_id: DeviceId,
        values: &mut Vec<CanonicalSensorValue>,
    ) -> Result<(), CoreError> {
        let endpoint = Endpoint::GenericDevice;
        if self.store.lookup(class, endpoint) == CapabilityStatus::Unavailable {
            return Ok(());
        }

        let data = match self.fetch(ctx, endpoint, device_id).await {
            Ok(Outcome::Success(data)) => data,
            Ok(Outcome::Unsupported { message }) => {
                info!(
                    device_class = %class,
                    %endpoint,
                    reason = %message,
                    "endpoint unsupported, marking unavailable"
                );
                self.store.record(class, endpoint, CapabilityStatus::Unavailable);
                return Ok(());
            }
            Err(loggamera_api::Error::Cancelled { .. }) => return Err(CoreError::Cancelled),
            Err(e) => {
                warn!(
                    %endpoint,
                    %device_id,
                    error = %e,
                    "supplementary read failed, keeping primary values"
                );
                return Ok(());
            }
        };

        let extra = self.normalizer.normalize(class, endpoint, &data, Utc::now());
        if extra.is_empty() {
            return Ok(());
        }
        self.store.record(class, endpoint, CapabilityStatus::Available);

        let before = values.len();
        for value in extra {
            if value.is_alarm_or_status() && !values.iter().any(|v| v.id == value.id) {
                values.push(value);
            }
        }
        debug!(
            %endpoint,
            %device_id,
            merged = values.len() - before,
            "merged alarm and status values"
        );
        Ok(())
    }

    /// Read and write capabilities.
    ///
    /// An empty pair when `GetCapabilities` is unusable for the class,
    /// including when the store already says so (no request is made).
    pub async fn capabilities(
        &self,
        ctx: &RequestContext,
        class: &DeviceClass,
        device_id: DeviceId,
    ) -> Result<Capabilities, CoreError> {
        let endpoint = Endpoint::GetCapabilities;
        if self.store.lookup(class, endpoint) == CapabilityStatus::Unavailable {
            debug!(device_class = %class, %device_id, "capabilities unavailable for class");
            return Ok(Capabilities::default());
        }
        match self
            .client
            .capabilities(device_id, ctx.organization(), ctx.cancel())
            .await?
        {
            Outcome::Success(data) => {
                self.store.record(class, endpoint, CapabilityStatus::Available);
                Ok(Capabilities::from(data))
            }
            Outcome::Unsupported { message } => {
                info!(
                    device_class = %class,
                    %endpoint,
                    reason = %message,
                    "endpoint unsupported, marking unavailable"
                );
                self.store.record(class, endpoint, CapabilityStatus::Unavailable);
                Ok(Capabilities::default())
            }
        }
    }

    async fn fetch(
        &self,
        ctx: &RequestContext,
        endpoint: Endpoint,
        device_id: DeviceId,
    ) -> Result<Outcome<DeviceData>, loggamera_api::Error> {
        self.client
            .device_data(endpoint, device_id, ctx.organization(), ctx.cancel())
            .await
    }
}
