//! Transport resilience: retry with exponential backoff and per-endpoint
//! circuit breaking.
//!
//! [`ResilientExecutor`] wraps a [`Transport`] and is the only place in the
//! workspace where requests are retried. It knows nothing about which
//! endpoint *should* be called for a device; that is the cascade's job.

mod circuit;
mod retry;

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use self::circuit::{Admission, CircuitBreakers, CircuitConfig, CircuitState};
pub use self::retry::{RetryConfig, calculate_backoff};

use crate::endpoint::Endpoint;
use crate::error::Error;
use crate::transport::{RawResponse, Transport};

/// Executes requests with retry and circuit breaking.
///
/// Retries connection errors, timeouts, 5xx and 429 responses. Any other
/// response is returned as-is on the first attempt.
pub struct ResilientExecutor<T> {
    transport: T,
    retry: RetryConfig,
    circuits: CircuitBreakers,
}

impl<T: Transport> ResilientExecutor<T> {
    pub fn new(transport: T, retry: RetryConfig, circuit: CircuitConfig) -> Self {
        Self {
            transport,
            retry,
            circuits: CircuitBreakers::new(circuit),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Current breaker state for an endpoint.
    pub fn circuit_state(&self, endpoint: Endpoint) -> CircuitState {
        self.circuits.state(endpoint)
    }

    /// Send `body` to `endpoint`, retrying transient failures.
    ///
    /// The cancellation token is checked before every attempt, raced against
    /// the in-flight request, and raced against every backoff sleep.
    pub async fn execute(
        &self,
        endpoint: Endpoint,
        body: &serde_json::Value,
        cancel: &CancellationToken,
    ) -> Result<RawResponse, Error> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled { endpoint });
        }

        let admission = self
            .circuits
            .admit(endpoint)
            .map_err(|retry_after| Error::CircuitOpen {
                endpoint,
                retry_after,
            })?;

        let mut attempt: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(self.cancelled(endpoint, admission));
            }

            debug!(%endpoint, attempt, "sending request");
            let sent = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                result = self.transport.send(endpoint, body) => Some(result),
            };
            let Some(result) = sent else {
                return Err(self.cancelled(endpoint, admission));
            };

            let (message, status) = match result {
                Ok(resp) if !resp.is_transient() => {
                    self.circuits.success(endpoint);
                    if attempt > 0 {
                        info!(%endpoint, retries = attempt, "request succeeded after retries");
                    }
                    return Ok(resp);
                }
                Ok(resp) => (format!("HTTP {}", resp.status), Some(resp.status)),
                Err(e) => (e.to_string(), None),
            };

            if attempt >= self.retry.max_retries {
                warn!(
                    %endpoint,
                    attempts = attempt + 1,
                    error = %message,
                    "request failed, retries exhausted"
                );
                self.circuits.failure(endpoint);
                return Err(Error::Network {
                    endpoint,
                    message,
                    status,
                    attempts: attempt + 1,
                });
            }

            let delay = calculate_backoff(attempt, &self.retry);
            warn!(
                %endpoint,
                attempt = attempt + 1,
                delay_ms = millis(delay),
                error = %message,
                "request failed, retrying"
            );

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(self.cancelled(endpoint, admission)),
                () = tokio::time::sleep(delay) => {}
            }

            attempt += 1;
        }
    }

    fn cancelled(&self, endpoint: Endpoint, admission: Admission) -> Error {
        debug!(%endpoint, "request cancelled");
        if admission == Admission::Trial {
            self.circuits.abandon(endpoint);
        }
        Error::Cancelled { endpoint }
    }
}

fn millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}
