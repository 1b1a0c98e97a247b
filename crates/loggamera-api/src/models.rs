// Loggamera API response types
//
// Every endpoint answers `{ "Data": {...}, "Error": null }`. Field names are
// PascalCase. Fields use `#[serde(default)]` liberally because the platform is
// inconsistent about field presence across device classes, and unknown fields
// land in `extra` so nothing is silently dropped.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::endpoint::{DeviceClass, Endpoint};
use crate::error::Error;

// ── Identifiers ──────────────────────────────────────────────────────

/// A device identifier. Always a positive integer, including when parsed
/// from a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u64")]
pub struct DeviceId(u64);

impl DeviceId {
    pub fn new(raw: i64) -> Result<Self, Error> {
        match u64::try_from(raw) {
            Ok(id) if id > 0 => Ok(Self(id)),
            _ => Err(Error::InvalidInput {
                field: "device id",
                reason: format!("{raw} is not a positive integer"),
            }),
        }
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl TryFrom<i64> for DeviceId {
    type Error = Error;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<DeviceId> for u64 {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}

impl FromStr for DeviceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: i64 = s.trim().parse().map_err(|_| Error::InvalidInput {
            field: "device id",
            reason: format!("{s:?} is not an integer"),
        })?;
        Self::new(raw)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An organization identifier. `0` is used by the platform as "no parent".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrganizationId(pub u64);

impl OrganizationId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OrganizationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ── Organizations ────────────────────────────────────────────────────

/// `Data` of the `Organizations` endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrganizationsData {
    #[serde(default)]
    pub organizations: Vec<Organization>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Organization {
    pub id: OrganizationId,
    #[serde(default)]
    pub name: String,
    /// `0` (or absent) for top-level organizations.
    #[serde(default)]
    pub parent_id: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Organization {
    /// The parent organization, `None` for roots.
    pub fn parent(&self) -> Option<OrganizationId> {
        self.parent_id.filter(|&p| p != 0).map(OrganizationId)
    }
}

// ── Devices ──────────────────────────────────────────────────────────

/// `Data` of the `Devices` endpoint. Older deployments return `Values`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DevicesData {
    #[serde(default, alias = "Values")]
    pub devices: Vec<Device>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Device {
    pub id: DeviceId,
    pub class: DeviceClass,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Device data ──────────────────────────────────────────────────────

/// `Data` of every device-data endpoint (dedicated, `RawData`, `GenericDevice`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeviceData {
    #[serde(default)]
    pub log_date_time_utc: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub values: Vec<RawValue>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One reading as the platform reports it.
///
/// `Value` arrives as a string, number, or boolean depending on the
/// endpoint; `ValueType` is frequently `null`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawValue {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub clear_text_name: Option<String>,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub value_type: Option<String>,
    #[serde(default)]
    pub unit_type: Option<String>,
    #[serde(default)]
    pub unit_presentation: Option<String>,
    #[serde(default)]
    pub log_date_time_utc: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Capabilities ─────────────────────────────────────────────────────

/// `Data` of `GetCapabilities`. Entries are either bare names or objects
/// with a `Name` field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CapabilitiesData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub read_capabilities: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub write_capabilities: Vec<Value>,
}

// ── Scenarios ────────────────────────────────────────────────────────

/// `Data` of the `Scenarios` endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScenariosData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub scenarios: Vec<Scenario>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Scenario {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Helpers ──────────────────────────────────────────────────────────

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Deserialize the `Data` member of a successful response.
///
/// A missing or `null` `Data` yields `T::default()`.
pub fn parse_data<T>(endpoint: Endpoint, payload: &Value) -> Result<T, Error>
where
    T: serde::de::DeserializeOwned + Default,
{
    match payload.get("Data") {
        None | Some(Value::Null) => Ok(T::default()),
        Some(data) => T::deserialize(data).map_err(|e| Error::MalformedResponse {
            endpoint,
            message: format!("unexpected Data shape: {e}"),
            body: truncate_body(&data.to_string()),
        }),
    }
}

/// Keep error bodies small enough to log.
pub(crate) fn truncate_body(body: &str) -> String {
    const LIMIT: usize = 512;
    match body.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_owned(),
    }
}
