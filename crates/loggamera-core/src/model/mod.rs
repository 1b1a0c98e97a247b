// ── Domain model ──
//
// Types handed to presentation layers. Raw wire shapes stay in
// `loggamera_api::models`.

pub mod capabilities;
pub mod organization;
pub mod sensor;

pub use capabilities::Capabilities;
pub use organization::{OrganizationNode, OrganizationTree};
pub use sensor::{
    CanonicalSensorValue, CatalogEntry, HeuristicBasis, SensorCategory, SensorClassification,
    SensorValue, StateClass, Unit, ValueKind,
};
