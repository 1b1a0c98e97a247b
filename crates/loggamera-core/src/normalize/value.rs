// ── Value coercion and type inference ──
//
// `Value` arrives as a JSON string, number or boolean depending on the
// endpoint, and `ValueType` is often null. The declared type is used when
// present; otherwise the type is inferred from the unit type, the catalogue,
// and the id.

use loggamera_api::models::RawValue;
use serde_json::Value;

use super::units::is_boolean_unit_type;
use crate::model::{CatalogEntry, SensorValue, ValueKind};

/// Longest text value kept, in characters.
pub const MAX_TEXT_LEN: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TypeHint {
    Boolean,
    Numeric,
    Text,
    /// Numeric when coercible, else text.
    Infer,
}

/// Decide how to read `raw.value`.
pub(crate) fn type_hint(raw: &RawValue, entry: Option<&CatalogEntry>) -> TypeHint {
    if let Some(declared) = declared_type(raw) {
        return declared;
    }
    if is_boolean_unit_type(raw) {
        return TypeHint::Boolean;
    }
    match entry.map(|e| e.kind) {
        Some(ValueKind::Boolean) => return TypeHint::Boolean,
        Some(ValueKind::Text) => return TypeHint::Text,
        Some(ValueKind::Numeric) => return TypeHint::Numeric,
        None => {}
    }
    // `0`/`1` stay numeric unless the unit type or the catalogue says
    // otherwise; counters share the shape.
    if looks_like_flag_id(&raw.name) && parse_bool_word(&raw.value).is_some() {
        return TypeHint::Boolean;
    }
    TypeHint::Infer
}

fn declared_type(raw: &RawValue) -> Option<TypeHint> {
    let declared = raw.value_type.as_deref()?.trim().to_lowercase();
    if declared.contains("bool") {
        return Some(TypeHint::Boolean);
    }
    match declared.as_str() {
        "decimal" | "double" | "float" | "int" | "integer" | "long" | "number" | "numeric" => {
            Some(TypeHint::Numeric)
        }
        "string" | "text" => Some(TypeHint::Text),
        _ => None,
    }
}

/// `alarmActive`, `filterAlarmIsActive`, `highTempAlarm`, `isHeating`.
/// Ids that merely mention an alarm (`alarmCount`) do not qualify.
fn looks_like_flag_id(id: &str) -> bool {
    let lower = id.to_ascii_lowercase();
    if lower.ends_with("active") || lower.ends_with("alarm") {
        return true;
    }
    id.strip_prefix("is")
        .and_then(|rest| rest.chars().next())
        .is_some_and(char::is_uppercase)
}

/// Coerce a raw JSON value. `None` means "no value" and the reading is
/// dropped.
pub(crate) fn coerce(value: &Value, hint: TypeHint) -> Option<SensorValue> {
    if value.is_null() {
        return None;
    }
    match hint {
        TypeHint::Boolean => match parse_bool(value) {
            Some(flag) => Some(SensorValue::Boolean(flag)),
            None => coerce(value, TypeHint::Infer),
        },
        TypeHint::Text => {
            let text = match value {
                Value::String(s) => s.trim().to_owned(),
                other => other.to_string(),
            };
            (!text.is_empty()).then(|| SensorValue::Text(truncate(&text)))
        }
        TypeHint::Numeric | TypeHint::Infer => match value {
            Value::Number(n) => n.as_f64().map(SensorValue::Numeric),
            Value::Bool(b) => Some(SensorValue::Boolean(*b)),
            Value::String(s) => {
                let s = s.trim();
                if s.is_empty() {
                    None
                } else {
                    Some(parse_number(s).map_or_else(
                        || SensorValue::Text(truncate(s)),
                        SensorValue::Numeric,
                    ))
                }
            }
            other => Some(SensorValue::Text(truncate(&other.to_string()))),
        },
    }
}

pub(crate) fn parse_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_f64() {
            Some(v) if v.abs() < f64::EPSILON => Some(false),
            Some(v) if (v - 1.0).abs() < f64::EPSILON => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "on" | "yes" => Some(true),
            "false" | "0" | "off" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Like [`parse_bool`], but only for values that are unmistakably boolean:
/// JSON booleans and word spellings, never numbers.
fn parse_bool_word(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "on" | "yes" => Some(true),
            "false" | "off" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Accepts a comma decimal separator (`"21,5"`).
fn parse_number(s: &str) -> Option<f64> {
    s.replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

fn truncate(s: &str) -> String {
    s.chars().take(MAX_TEXT_LEN).collect()
}
