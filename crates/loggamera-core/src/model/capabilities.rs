// ── Device capabilities ──

use loggamera_api::models::CapabilitiesData;
use serde::Serialize;
use serde_json::Value;

/// Sensor ids a device can be read from and written to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub readable: Vec<String>,
    pub writable: Vec<String>,
}

impl Capabilities {
    pub fn is_empty(&self) -> bool {
        self.readable.is_empty() && self.writable.is_empty()
    }
}

impl From<CapabilitiesData> for Capabilities {
    fn from(data: CapabilitiesData) -> Self {
        Self {
            readable: sensor_ids(&data.read_capabilities),
            writable: sensor_ids(&data.write_capabilities),
        }
    }
}

/// Entries are bare names, numeric ids, or objects carrying `Name`.
fn sensor_ids(entries: &[Value]) -> Vec<String> {
    let mut ids: Vec<String> = Vec::with_capacity(entries.len());
    for entry in entries {
        let id = match entry {
            Value::String(s) => Some(s.trim().to_owned()),
            Value::Number(n) => Some(n.to_string()),
            Value::Object(map) => match map.get("Name") {
                Some(Value::String(s)) => Some(s.trim().to_owned()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            },
            _ => None,
        };
        if let Some(id) = id.filter(|id| !id.is_empty()) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    ids
}
