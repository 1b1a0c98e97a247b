// ── Canonical sensor values ──

use std::fmt;

use chrono::{DateTime, Utc};
use loggamera_api::Endpoint;
use serde::Serialize;
use strum::Display;

/// A physical unit. Vendor spellings that differ only in case (or in
/// `m3` vs `m³`) collapse to the same variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Unit {
    KilowattHour,
    Kilowatt,
    Watt,
    CubicMeter,
    Liter,
    Celsius,
    Percent,
    Ampere,
    Volt,
    /// Anything else, lowercased.
    Other(String),
}

impl Unit {
    /// Display symbol.
    pub fn symbol(&self) -> &str {
        match self {
            Self::KilowattHour => "kWh",
            Self::Kilowatt => "kW",
            Self::Watt => "W",
            Self::CubicMeter => "m³",
            Self::Liter => "L",
            Self::Celsius => "°C",
            Self::Percent => "%",
            Self::Ampere => "A",
            Self::Volt => "V",
            Self::Other(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A reading after coercion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SensorValue {
    Numeric(f64),
    Boolean(bool),
    Text(String),
}

impl SensorValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }
}

/// Physical (or logical) quantity a sensor reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
pub enum SensorCategory {
    Energy,
    Power,
    Temperature,
    Humidity,
    Water,
    Current,
    Voltage,
    Alarm,
    Status,
    /// An on/off value with no better category.
    Binary,
    /// Free text (alarm descriptions and the like).
    Text,
}

/// How a value evolves over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
pub enum StateClass {
    Measurement,
    TotalIncreasing,
}

/// The shape a catalogued sensor's value is expected to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ValueKind {
    Numeric,
    Boolean,
    Text,
}

/// A sensor id with a confident, hand-maintained mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub id: &'static str,
    pub name: &'static str,
    pub category: SensorCategory,
    pub unit: Option<Unit>,
    pub state_class: Option<StateClass>,
    pub kind: ValueKind,
}

/// Which metadata a heuristic classification was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum HeuristicBasis {
    Unit,
    Name,
    Value,
}

/// Confidence-tagged classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SensorClassification {
    /// The id is in the sensor catalogue.
    Known(&'static CatalogEntry),
    /// Best-effort guess for an uncatalogued id.
    Heuristic {
        category: SensorCategory,
        basis: HeuristicBasis,
    },
    Unclassified,
}

impl SensorClassification {
    pub fn category(&self) -> Option<SensorCategory> {
        match self {
            Self::Known(entry) => Some(entry.category),
            Self::Heuristic { category, .. } => Some(*category),
            Self::Unclassified => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }
}

/// One normalized reading, ready for a presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalSensorValue {
    /// Vendor sensor id (`Name` in the payload).
    pub id: String,
    pub display_name: String,
    pub unit: Option<Unit>,
    pub value: SensorValue,
    pub updated_at: Option<DateTime<Utc>>,
    /// Older than the configured threshold. Stale values are still returned.
    pub stale: bool,
    pub classification: SensorClassification,
    /// Endpoint the value was read from.
    pub source: Endpoint,
}

impl CanonicalSensorValue {
    /// Alarm flags, alarm descriptions and activity/status indicators.
    pub fn is_alarm_or_status(&self) -> bool {
        if matches!(
            self.classification.category(),
            Some(SensorCategory::Alarm | SensorCategory::Status)
        ) {
            return true;
        }
        let id = self.id.to_ascii_lowercase();
        id.contains("alarm") || id.contains("status")
    }
}
