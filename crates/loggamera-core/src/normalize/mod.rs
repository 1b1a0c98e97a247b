// ── Sensor value normalizer ──
//
// Turns a device-data payload into `CanonicalSensorValue`s: display-name
// corrections, unit canonicalization, value coercion, type inference,
// classification, and staleness.

pub mod catalog;
pub mod classify;
pub mod units;
pub mod value;

use std::collections::HashSet;

use chrono::{DateTime, NaiveDateTime, Utc};
use loggamera_api::models::{DeviceData, RawValue};
use loggamera_api::{DeviceClass, Endpoint};
use tracing::{debug, trace};

use crate::config::NormalizerConfig;
use crate::model::{CanonicalSensorValue, SensorClassification, SensorValue};

pub use catalog::correct_name;
pub use units::{canonical_unit, parse_unit};

#[derive(Debug, Clone, Default)]
pub struct SensorNormalizer {
    config: NormalizerConfig,
}

impl SensorNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Normalize every reading of `data`, read from `source` for a device of
    /// `class`, as seen at `now`.
    ///
    /// Readings without an id or without a value are dropped; a repeated id
    /// keeps its first reading. Everything else is returned, stale or not.
    pub fn normalize(
        &self,
        class: &DeviceClass,
        source: Endpoint,
        data: &DeviceData,
        now: DateTime<Utc>,
    ) -> Vec<CanonicalSensorValue> {
        let payload_time = data.log_date_time_utc.as_deref().and_then(parse_timestamp);
        let mut seen = HashSet::new();
        let mut values = Vec::with_capacity(data.values.len());

        for raw in &data.values {
            let id = raw.name.trim();
            if id.is_empty() {
                trace!(%source, "skipping value without a name");
                continue;
            }
            if !seen.insert(id.to_owned()) {
                debug!(%source, sensor = id, "duplicate sensor id, keeping the first");
                continue;
            }
            match self.normalize_one(raw, id, source, payload_time, now) {
                Some(value) => values.push(value),
                None => trace!(%source, sensor = id, "skipping empty value"),
            }
        }

        debug!(
            device_class = %class,
            %source,
            received = data.values.len(),
            normalized = values.len(),
            "normalized device data"
        );
        values
    }

    fn normalize_one(
        &self,
        raw: &RawValue,
        id: &str,
        source: Endpoint,
        payload_time: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Option<CanonicalSensorValue> {
        let entry = catalog::lookup(id);
        let value = value::coerce(&raw.value, value::type_hint(raw, entry))?;

        let clear_text = raw
            .clear_text_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let display_name = match clear_text {
            Some(text) => catalog::correct_name(id, text).unwrap_or(text).to_owned(),
            None => entry.map_or_else(|| id.to_owned(), |e| e.name.to_owned()),
        };

        let unit = match &value {
            SensorValue::Numeric(_) => entry
                .and_then(|e| e.unit.clone())
                .or_else(|| units::canonical_unit(raw)),
            SensorValue::Boolean(_) | SensorValue::Text(_) => None,
        };

        let classification = match entry {
            Some(entry) => SensorClassification::Known(entry),
            None => classify::heuristic(id, clear_text, unit.as_ref(), &value),
        };

        let updated_at = raw
            .log_date_time_utc
            .as_deref()
            .and_then(parse_timestamp)
            .or(payload_time);

        Some(CanonicalSensorValue {
            id: id.to_owned(),
            display_name,
            unit,
            value,
            updated_at,
            stale: self.is_stale(updated_at, now),
            classification,
            source,
        })
    }

    /// Strictly older than the threshold. Untimed values are never stale.
    pub fn is_stale(&self, updated_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        let Some(updated_at) = updated_at else {
            return false;
        };
        chrono::Duration::from_std(self.config.stale_after)
            .is_ok_and(|threshold| now - updated_at > threshold)
    }
}

/// RFC 3339, or a naive timestamp taken as UTC (`2026-10-19T08:00:00`,
/// `2026-10-19 08:00:00`).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::model::{SensorCategory, Unit};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    fn payload(raw: serde_json::Value) -> DeviceData {
        serde_json::from_value(raw).unwrap()
    }

    fn normalize(data: &DeviceData) -> Vec<CanonicalSensorValue> {
        SensorNormalizer::default().normalize(
            &DeviceClass::PowerMeter,
            Endpoint::PowerMeter,
            data,
            now(),
        )
    }

    #[test]
    fn power_meter_payload() {
        let data = payload(json!({
            "LogDateTimeUtc": "2026-10-19T11:50:00Z",
            "Values": [
                {"Name": "ConsumedTotalInkWh", "ClearTextName": "Consumed total", "Value": "1234,5",
                 "ValueType": null, "UnitType": "KiloWattHour", "UnitPresentation": "kWh"},
                {"Name": "PowerInkW", "ClearTextName": "Effect", "Value": 1.8},
                {"Name": "alarmActive", "ClearTextName": "Alarm", "Value": "False",
                 "ValueType": null},
                {"Name": "alarmInClearText", "Value": ""}
            ]
        }));
        let values = normalize(&data);
        assert_eq!(values.len(), 3, "empty alarm text is dropped");

        let total = &values[0];
        assert_eq!(total.value, SensorValue::Numeric(1234.5));
        assert_eq!(total.unit, Some(Unit::KilowattHour));
        assert_eq!(total.display_name, "Consumed total");
        assert!(total.classification.is_known());
        assert!(!total.stale);
        assert_eq!(total.source, Endpoint::PowerMeter);

        assert_eq!(values[1].display_name, "Power");
        assert_eq!(values[1].unit, Some(Unit::Kilowatt));

        assert_eq!(values[2].value, SensorValue::Boolean(false));
        assert_eq!(values[2].unit, None);
        assert!(values[2].is_alarm_or_status());
    }

    #[test]
    fn correction_is_idempotent() {
        let misspelled = payload(json!({"Values": [
            {"Name": "TemperatureInC", "ClearTextName": "Temprature", "Value": "21.5"}
        ]}));
        let fixed = payload(json!({"Values": [
            {"Name": "TemperatureInC", "ClearTextName": "Temperature", "Value": "21.5"}
        ]}));
        assert_eq!(normalize(&misspelled)[0].display_name, "Temperature");
        assert_eq!(normalize(&fixed)[0].display_name, "Temperature");

        let renamed = payload(json!({"Values": [
            {"Name": "TemperatureInC", "ClearTextName": "Indoor", "Value": "21.5"}
        ]}));
        assert_eq!(normalize(&renamed)[0].display_name, "Indoor");
    }

    #[test]
    fn water_ids_in_either_case_share_a_unit() {
        let data = payload(json!({"Values": [
            {"Name": "ConsumedTotalInm3", "Value": "10.5"},
            {"Name": "ConsumedTotalInM3", "Value": "10.5"}
        ]}));
        let values = normalize(&data);
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].unit, values[1].unit);
        assert_eq!(values[0].unit, Some(Unit::CubicMeter));
    }

    #[test]
    fn staleness_boundary_is_fresh() {
        let normalizer = SensorNormalizer::default();
        let two_hours = chrono::Duration::hours(2);
        assert!(!normalizer.is_stale(Some(now() - two_hours), now()));
        assert!(normalizer.is_stale(Some(now() - two_hours - chrono::Duration::seconds(1)), now()));
        assert!(normalizer.is_stale(Some(now() - chrono::Duration::hours(3)), now()));
        assert!(!normalizer.is_stale(Some(now() - chrono::Duration::minutes(10)), now()));
        assert!(!normalizer.is_stale(None, now()));
    }

    #[test]
    fn threshold_is_configurable() {
        let normalizer = SensorNormalizer::new(NormalizerConfig {
            stale_after: Duration::from_secs(600),
        });
        assert!(normalizer.is_stale(Some(now() - chrono::Duration::minutes(11)), now()));
    }

    #[test]
    fn value_timestamp_overrides_payload_timestamp() {
        let data = payload(json!({
            "LogDateTimeUtc": "2026-10-19T11:55:00Z",
            "Values": [
                {"Name": "544352", "Value": "10", "LogDateTimeUtc": "2026-10-19T06:00:00"},
                {"Name": "544399", "Value": "250"}
            ]
        }));
        let values = normalize(&data);
        assert!(values[0].stale);
        assert_eq!(
            values[0].updated_at,
            Some(Utc.with_ymd_and_hms(2026, 10, 19, 6, 0, 0).unwrap())
        );
        assert!(!values[1].stale);
        assert_eq!(values[1].unit, Some(Unit::Watt));
    }

    #[test]
    fn unknown_sensors_are_kept() {
        let data = payload(json!({"Values": [
            {"Name": "598001", "ClearTextName": "Framledningstemperatur", "Value": "41"},
            {"Name": "598002", "ClearTextName": "Driftläge", "Value": "2"},
            {"Name": "598002", "ClearTextName": "duplicate", "Value": "3"},
            {"Name": "", "Value": "5"}
        ]}));
        let values = normalize(&data);
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].classification.category(), Some(SensorCategory::Temperature));
        assert!(!values[0].classification.is_known());
        assert_eq!(values[1].classification, SensorClassification::Unclassified);
        assert_eq!(values[1].value, SensorValue::Numeric(2.0));
    }

    #[test]
    fn counters_stay_numeric_across_polls() {
        for (raw, expected) in [("1", 1.0), ("2", 2.0), ("0", 0.0)] {
            let data = payload(json!({"Values": [
                {"Name": "alarmCount", "ClearTextName": "Alarm count", "Value": raw}
            ]}));
            let values = normalize(&data);
            assert_eq!(values[0].value, SensorValue::Numeric(expected), "alarmCount = {raw}");
        }
    }

    #[test]
    fn uncatalogued_text_is_classified_as_text() {
        let data = payload(json!({"Values": [
            {"Name": "598010", "ClearTextName": "Driftstatus", "Value": "Door open"},
            {"Name": "598011", "ClearTextName": "Larmtext", "Value": "Low flow"}
        ]}));
        let values = normalize(&data);
        assert_eq!(values[0].value, SensorValue::Text("Door open".into()));
        assert_eq!(values[0].classification.category(), Some(SensorCategory::Text));
        assert_eq!(values[1].classification.category(), Some(SensorCategory::Text));
    }

    #[test]
    fn timestamps_parse_with_and_without_zone() {
        assert!(parse_timestamp("2026-10-19T08:00:00Z").is_some());
        assert!(parse_timestamp("2026-10-19T08:00:00.123").is_some());
        assert!(parse_timestamp("2026-10-19 08:00:00").is_some());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }
}
