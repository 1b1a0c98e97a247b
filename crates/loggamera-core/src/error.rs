// ── Core error types ──
//
// User-facing errors from loggamera-core. Consumers never see raw bodies or
// have to parse messages: every variant carries the structured detail needed
// to render a diagnostic. "Endpoint unsupported" never appears here; the
// cascade absorbs it.

use std::fmt;

use loggamera_api::{DeviceId, Endpoint};
use strum::Display;
use thiserror::Error;

use crate::cascade::EndpointAttempt;

/// Coarse classification of a [`CoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ErrorKind {
    Network,
    CircuitOpen,
    AllEndpointsExhausted,
    MalformedResponse,
    Authentication,
    Rejected,
    Cancelled,
    Config,
    InvalidInput,
    DeviceNotFound,
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Upstream availability ────────────────────────────────────────
    #[error("Network error calling {endpoint} after {attempts} attempt(s): {message}")]
    Network {
        endpoint: Endpoint,
        message: String,
        status: Option<u16>,
        attempts: u32,
    },

    #[error("Circuit open for {endpoint} -- retry after {retry_after_secs}s")]
    CircuitOpen {
        endpoint: Endpoint,
        retry_after_secs: u64,
    },

    // ── Endpoint selection ───────────────────────────────────────────
    #[error("No endpoint returned data for device {device_id} ({})", AttemptTrail(attempts))]
    AllEndpointsExhausted {
        device_id: DeviceId,
        attempts: Vec<EndpointAttempt>,
    },

    // ── Vendor responses ─────────────────────────────────────────────
    #[error("Malformed response from {endpoint}: {message}")]
    MalformedResponse { endpoint: Endpoint, message: String },

    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    #[error("{endpoint} rejected the request: {message}")]
    Rejected {
        endpoint: Endpoint,
        message: String,
        status: Option<u16>,
    },

    // ── Caller-side ──────────────────────────────────────────────────
    #[error("Operation cancelled")]
    Cancelled,

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Device not found: {device_id}")]
    DeviceNotFound { device_id: DeviceId },
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } => ErrorKind::Network,
            Self::CircuitOpen { .. } => ErrorKind::CircuitOpen,
            Self::AllEndpointsExhausted { .. } => ErrorKind::AllEndpointsExhausted,
            Self::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::Rejected { .. } => ErrorKind::Rejected,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Config { .. } => ErrorKind::Config,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::DeviceNotFound { .. } => ErrorKind::DeviceNotFound,
        }
    }

    /// Worth trying again later without changing anything.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::CircuitOpen { .. })
    }

    /// The endpoint trail of an exhausted cascade.
    pub fn attempts(&self) -> &[EndpointAttempt] {
        match self {
            Self::AllEndpointsExhausted { attempts, .. } => attempts,
            _ => &[],
        }
    }
}

struct AttemptTrail<'a>(&'a [EndpointAttempt]);

impl fmt::Display for AttemptTrail<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, attempt) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{attempt}")?;
        }
        Ok(())
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<loggamera_api::Error> for CoreError {
    fn from(err: loggamera_api::Error) -> Self {
        match err {
            loggamera_api::Error::Authentication { message } => Self::Authentication { message },
            loggamera_api::Error::Network {
                endpoint,
                message,
                status,
                attempts,
            } => Self::Network {
                endpoint,
                message,
                status,
                attempts,
            },
            loggamera_api::Error::CircuitOpen {
                endpoint,
                retry_after,
            } => Self::CircuitOpen {
                endpoint,
                // Round up so "retry after 0s" is never reported while still open.
                retry_after_secs: retry_after
                    .as_secs()
                    .saturating_add(u64::from(retry_after.subsec_nanos() > 0)),
            },
            loggamera_api::Error::Cancelled { .. } => Self::Cancelled,
            loggamera_api::Error::InvalidUrl(e) => Self::Config {
                message: format!("Invalid URL: {e}"),
            },
            loggamera_api::Error::Tls(msg) => Self::Config {
                message: format!("TLS error: {msg}"),
            },
            loggamera_api::Error::MalformedResponse {
                endpoint,
                message,
                body: _,
            } => Self::MalformedResponse { endpoint, message },
            loggamera_api::Error::Rejected {
                endpoint,
                message,
                status,
            } => Self::Rejected {
                endpoint,
                message,
                status,
            },
            loggamera_api::Error::InvalidInput { field, reason } => Self::InvalidInput {
                message: format!("{field}: {reason}"),
            },
        }
    }
}
