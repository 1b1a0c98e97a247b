use std::time::Duration;

use thiserror::Error;

use crate::endpoint::Endpoint;

/// Top-level error type for the `loggamera-api` crate.
///
/// Covers every failure mode below the endpoint-selection layer:
/// client construction, transport, circuit breaking, and response
/// classification. `loggamera-core` maps these into user-facing diagnostics.
///
/// "Endpoint not supported for this device" is deliberately *not* an error
/// here -- it is an [`Outcome`](crate::Outcome) the cascade resolver acts on.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// API key rejected, or the key lacks access to the requested resource.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// Transient failure that survived every retry: connection refused,
    /// timeout, or a 5xx/429 response.
    #[error("Network error calling {endpoint} after {attempts} attempt(s): {message}")]
    Network {
        endpoint: Endpoint,
        message: String,
        /// HTTP status of the last attempt, if a response was received.
        status: Option<u16>,
        attempts: u32,
    },

    /// The endpoint's circuit is open; no request was sent.
    #[error("Circuit open for {endpoint} -- retry after {}s", retry_after.as_secs())]
    CircuitOpen {
        endpoint: Endpoint,
        retry_after: Duration,
    },

    /// The caller's cancellation token fired before the request completed.
    #[error("Request to {endpoint} cancelled")]
    Cancelled { endpoint: Endpoint },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Vendor responses ────────────────────────────────────────────
    /// The body violates the vendor's (informal) response contract.
    #[error("Malformed response from {endpoint}: {message}")]
    MalformedResponse {
        endpoint: Endpoint,
        message: String,
        body: String,
    },

    /// The vendor refused the request with an error that is neither an
    /// endpoint gap nor an authentication failure.
    #[error("{endpoint} rejected the request: {message}")]
    Rejected {
        endpoint: Endpoint,
        message: String,
        status: Option<u16>,
    },

    // ── Input ───────────────────────────────────────────────────────
    /// A caller-supplied identifier is not valid for the API.
    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying later.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::CircuitOpen { .. })
    }

    /// Returns `true` if the API key was rejected.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// The endpoint the failing request targeted, when known.
    pub fn endpoint(&self) -> Option<Endpoint> {
        match self {
            Self::Network { endpoint, .. }
            | Self::CircuitOpen { endpoint, .. }
            | Self::Cancelled { endpoint }
            | Self::MalformedResponse { endpoint, .. }
            | Self::Rejected { endpoint, .. } => Some(*endpoint),
            _ => None,
        }
    }
}
