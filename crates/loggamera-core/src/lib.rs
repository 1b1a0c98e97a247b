//! Endpoint selection, capability discovery, and sensor normalization for
//! the Loggamera platform.
//!
//! - **[`Controller`]**: facade for presentation layers. Given a device id
//!   and class it switches to the owning organization, walks the endpoint
//!   cascade, and returns [`CanonicalSensorValue`]s.
//!
//! - **[`CascadeResolver`]**: tries the dedicated class endpoint, then
//!   `RawData`, then `GenericDevice`, consulting and updating a
//!   [`CapabilityStore`] so known-missing endpoints cost no request.
//!
//! - **[`SensorNormalizer`]**: display-name corrections, unit
//!   canonicalization, value coercion, classification and staleness.
//!
//! - **[`RequestContext`]**: per-call-chain organization scope stack and
//!   cancellation token.
//!
//! Transport resilience (retry, circuit breaking) and response
//! classification live in `loggamera-api`.

pub mod capability;
pub mod cascade;
pub mod config;
pub mod controller;
pub mod error;
pub mod gaps;
pub mod inventory;
pub mod model;
pub mod normalize;
pub mod scope;

// ── Primary re-exports ──────────────────────────────────────────────
pub use capability::{
    CapabilityCache, CapabilityEntry, CapabilityRecord, CapabilityStatus, CapabilityStore,
};
pub use cascade::{AttemptOutcome, CascadeResolver, EndpointAttempt, Intent, Resolved};
pub use config::{CapabilityPolicy, ControllerConfig, NormalizerConfig, TlsVerification};
pub use controller::Controller;
pub use error::{CoreError, ErrorKind};
pub use gaps::{DataGapTracker, DeviceGap, GapReport};
pub use inventory::{DeviceDirectory, Inventory, InventoryDevice};
pub use model::{
    CanonicalSensorValue, Capabilities, OrganizationTree, SensorCategory, SensorClassification,
    SensorValue, Unit,
};
pub use normalize::SensorNormalizer;
pub use scope::{OrgScope, RequestContext};

// Identifier and vocabulary types callers need alongside the controller.
pub use loggamera_api::{DeviceClass, DeviceId, Endpoint, OrganizationId};
