// loggamera-api: Async Rust client for the Loggamera platform API
//
// Transport, retry/circuit breaking, and response classification. Endpoint
// *selection* lives in loggamera-core.

pub mod client;
pub mod endpoint;
pub mod error;
pub mod models;
pub mod outcome;
pub mod resilience;
pub mod transport;

// Endpoint helpers, implemented as inherent methods on `LoggameraClient`.
mod devices;
mod organizations;
mod scenarios;

pub use client::{ApiRequest, LoggameraClient, Outcome};
pub use endpoint::{DeviceClass, Endpoint};
pub use error::Error;
pub use models::{DeviceId, OrganizationId};
pub use outcome::{NormalizedOutcome, OutcomeKind, classify};
pub use resilience::{CircuitConfig, CircuitState, ResilientExecutor, RetryConfig};
pub use transport::{
    DEFAULT_BASE_URL, HttpTransport, RawResponse, TlsMode, Transport, TransportConfig,
    TransportError, TransportErrorKind,
};
