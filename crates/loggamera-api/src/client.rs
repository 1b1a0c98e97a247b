// Loggamera API client
//
// Composes the resilient executor with the response classifier. Typed
// endpoint helpers (organizations, device data, scenarios) are inherent
// methods in sibling modules; this file owns request mechanics only.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::endpoint::Endpoint;
use crate::error::Error;
use crate::models::{DeviceId, OrganizationId, truncate_body};
use crate::outcome::{NormalizedOutcome, classify};
use crate::resilience::{CircuitConfig, CircuitState, ResilientExecutor, RetryConfig};
use crate::transport::{HttpTransport, Transport, TransportConfig};

// ── Request / Outcome ────────────────────────────────────────────────

/// One logical request: an endpoint plus its JSON body (minus the key).
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    endpoint: Endpoint,
    body: Map<String, Value>,
}

impl ApiRequest {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            body: Map::new(),
        }
    }

    /// A device-scoped request: `{"DeviceId": id}`.
    pub fn for_device(endpoint: Endpoint, device_id: DeviceId) -> Self {
        Self::new(endpoint).with("DeviceId", device_id.get())
    }

    /// Add or replace a body field.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.body.insert(key.to_owned(), value.into());
        self
    }

    /// Set `OrganizationId` when a scope is active.
    pub fn scoped(self, organization: Option<OrganizationId>) -> Self {
        match organization {
            Some(org) => self.with("OrganizationId", org.get()),
            None => self,
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }
}

/// A definitive answer from the platform.
///
/// "This endpoint does not exist for this device" is an answer, not an
/// error: the caller decides whether to fall back.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T = Value> {
    Success(T),
    Unsupported { message: String },
}

impl<T> Outcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Success(v) => Outcome::Success(f(v)),
            Self::Unsupported { message } => Outcome::Unsupported { message },
        }
    }

    /// `Success` payload, or `fallback` for an unsupported endpoint.
    pub fn unwrap_or(self, fallback: T) -> T {
        match self {
            Self::Success(v) => v,
            Self::Unsupported { .. } => fallback,
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}

// ── Client ───────────────────────────────────────────────────────────

struct ClientInner<T> {
    executor: ResilientExecutor<T>,
    api_key: SecretString,
}

/// Async client for the Loggamera v2 API.
///
/// Cheaply cloneable; clones share transport, retry policy and circuit
/// breakers.
pub struct LoggameraClient<T = HttpTransport> {
    inner: Arc<ClientInner<T>>,
}

impl<T> Clone for LoggameraClient<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl LoggameraClient<HttpTransport> {
    /// Create a client backed by reqwest.
    ///
    /// `base_url` is the API root, e.g. `https://platform.loggamera.se/api/v2`.
    pub fn new(
        base_url: Url,
        api_key: SecretString,
        transport: &TransportConfig,
        retry: RetryConfig,
        circuit: CircuitConfig,
    ) -> Result<Self, Error> {
        let http = HttpTransport::new(base_url, transport)?;
        Ok(Self::with_transport(http, api_key, retry, circuit))
    }
}

impl<T: Transport> LoggameraClient<T> {
    /// Create a client over any [`Transport`] (fakes in tests).
    pub fn with_transport(
        transport: T,
        api_key: SecretString,
        retry: RetryConfig,
        circuit: CircuitConfig,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                executor: ResilientExecutor::new(transport, retry, circuit),
                api_key,
            }),
        }
    }

    pub fn transport(&self) -> &T {
        self.inner.executor.transport()
    }

    pub fn circuit_state(&self, endpoint: Endpoint) -> CircuitState {
        self.inner.executor.circuit_state(endpoint)
    }

    /// Execute a request and classify the response.
    ///
    /// Adds `ApiKey` to the body. Transient failures are retried by the
    /// executor; everything that reaches the classifier is definitive.
    pub async fn call(
        &self,
        request: ApiRequest,
        cancel: &CancellationToken,
    ) -> Result<Outcome, Error> {
        let endpoint = request.endpoint;
        let mut body = request.body;
        body.insert(
            "ApiKey".into(),
            Value::String(self.inner.api_key.expose_secret().to_owned()),
        );
        let body = Value::Object(body);

        let raw = self.inner.executor.execute(endpoint, &body, cancel).await?;

        // Fire-and-forget endpoints acknowledge with an empty 2xx body.
        if endpoint.acknowledges_empty() && is_empty_success(raw.status, &raw.body) {
            debug!(%endpoint, "empty acknowledgement");
            return Ok(Outcome::Success(Value::Null));
        }

        match classify(raw.status, &raw.body) {
            NormalizedOutcome::Success(payload) => Ok(Outcome::Success(payload)),
            NormalizedOutcome::EndpointUnsupported { message } => {
                debug!(%endpoint, reason = %message, "endpoint unsupported");
                Ok(Outcome::Unsupported { message })
            }
            NormalizedOutcome::Authentication { message } => {
                Err(Error::Authentication { message })
            }
            NormalizedOutcome::Malformed { message } => Err(Error::MalformedResponse {
                endpoint,
                message,
                body: truncate_body(&raw.body),
            }),
            NormalizedOutcome::Rejected { status, message } => Err(Error::Rejected {
                endpoint,
                message,
                status: Some(status),
            }),
            // The executor only returns non-transient responses.
            NormalizedOutcome::Transient { status, message } => Err(Error::Network {
                endpoint,
                message,
                status: Some(status),
                attempts: 1,
            }),
        }
    }
}

fn is_empty_success(status: u16, body: &str) -> bool {
    (200..300).contains(&status) && body.trim().is_empty()
}
