// ── Unit canonicalization ──

use loggamera_api::models::RawValue;

use crate::model::Unit;

/// Parse a vendor unit token, case-insensitively.
///
/// `None` for blanks and for type markers that vendors put in `UnitType`
/// (`Boolean`, `BooleanOnOff`, `Text`, ...).
pub fn parse_unit(raw: &str) -> Option<Unit> {
    let token = raw.trim().to_lowercase();
    if token.is_empty() || is_type_marker(&token) {
        return None;
    }
    let unit = match token.replace(' ', "").as_str() {
        "kwh" | "kilowatthour" | "kilowatthours" => Unit::KilowattHour,
        "kw" | "kilowatt" | "kilowatts" => Unit::Kilowatt,
        "w" | "watt" | "watts" => Unit::Watt,
        "m3" | "m³" | "cubicmeter" | "cubicmeters" | "cubicmetre" | "cubicmetres" => {
            Unit::CubicMeter
        }
        "l" | "liter" | "liters" | "litre" | "litres" => Unit::Liter,
        "°c" | "c" | "deg" | "degc" | "celsius" | "degreecelsius" | "degreescelsius" => {
            Unit::Celsius
        }
        "%" | "percent" | "percentage" | "rh" | "%rh" => Unit::Percent,
        "a" | "amp" | "amps" | "ampere" | "amperes" => Unit::Ampere,
        "v" | "volt" | "volts" => Unit::Volt,
        _ => Unit::Other(token),
    };
    Some(unit)
}

fn is_type_marker(token: &str) -> bool {
    token.starts_with("boolean") || matches!(token, "none" | "text" | "string" | "unknown")
}

/// Unit of a raw value: `UnitPresentation`, then `UnitType`, then the
/// `...In<unit>` suffix of the sensor id. The suffix only counts when it
/// names a known unit.
pub fn canonical_unit(raw: &RawValue) -> Option<Unit> {
    let declared = [raw.unit_presentation.as_deref(), raw.unit_type.as_deref()];
    let mut fallback = None;
    for unit in declared.into_iter().flatten().filter_map(parse_unit) {
        if unit.is_known() {
            return Some(unit);
        }
        fallback.get_or_insert(unit);
    }
    unit_from_id(&raw.name).or(fallback)
}

/// `ConsumedTotalInkWh` → kWh, `TemperatureInC` → °C.
pub fn unit_from_id(id: &str) -> Option<Unit> {
    let (_, suffix) = id.rsplit_once("In")?;
    parse_unit(suffix).filter(Unit::is_known)
}

/// `UnitType` says the value is a boolean.
pub fn is_boolean_unit_type(raw: &RawValue) -> bool {
    raw.unit_type
        .as_deref()
        .is_some_and(|t| t.trim().to_lowercase().starts_with("boolean"))
}
