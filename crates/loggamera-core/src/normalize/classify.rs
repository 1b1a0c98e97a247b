// ── Heuristic classification ──
//
// Uncatalogued sensors still surface. The unit is the strongest signal,
// then (for flags) the id, then name tokens in the vendor's Swedish and
// English spellings.

use crate::model::{HeuristicBasis, SensorCategory, SensorClassification, SensorValue, Unit};

const NAME_TOKENS: &[(SensorCategory, &[&str])] = &[
    (SensorCategory::Temperature, &["temp"]),
    (SensorCategory::Energy, &["energy", "energi", "förbrukning", "kwh"]),
    (SensorCategory::Power, &["power", "effekt", "watt"]),
    (SensorCategory::Current, &["ampere", "ström"]),
    (SensorCategory::Voltage, &["voltage", "spänning"]),
    (SensorCategory::Water, &["water", "vatten", "volume"]),
    (SensorCategory::Humidity, &["humidity", "fukt"]),
];

/// Best-effort classification from `id`, the vendor display text, the
/// canonical unit, and the coerced value.
pub fn heuristic(
    id: &str,
    clear_text: Option<&str>,
    unit: Option<&Unit>,
    value: &SensorValue,
) -> SensorClassification {
    if let Some(category) = unit.and_then(category_of_unit) {
        return SensorClassification::Heuristic {
            category,
            basis: HeuristicBasis::Unit,
        };
    }

    let name = format!("{id} {}", clear_text.unwrap_or_default()).to_lowercase();

    match value {
        SensorValue::Boolean(_) => {
            let (category, basis) = if name.contains("alarm") {
                (SensorCategory::Alarm, HeuristicBasis::Name)
            } else if ["active", "status", "mode", "activity"]
                .iter()
                .any(|t| name.contains(t))
            {
                (SensorCategory::Status, HeuristicBasis::Name)
            } else {
                (SensorCategory::Binary, HeuristicBasis::Value)
            };
            SensorClassification::Heuristic { category, basis }
        }
        SensorValue::Text(_) if name.contains("alarm") => SensorClassification::Heuristic {
            category: SensorCategory::Alarm,
            basis: HeuristicBasis::Name,
        },
        SensorValue::Text(_) => SensorClassification::Heuristic {
            category: SensorCategory::Text,
            basis: HeuristicBasis::Value,
        },
        SensorValue::Numeric(_) => NAME_TOKENS
            .iter()
            .find(|(_, tokens)| tokens.iter().any(|t| name.contains(t)))
            .map_or(SensorClassification::Unclassified, |(category, _)| {
                SensorClassification::Heuristic {
                    category: *category,
                    basis: HeuristicBasis::Name,
                }
            }),
    }
}

fn category_of_unit(unit: &Unit) -> Option<SensorCategory> {
    match unit {
        Unit::Celsius => Some(SensorCategory::Temperature),
        Unit::KilowattHour => Some(SensorCategory::Energy),
        Unit::Kilowatt | Unit::Watt => Some(SensorCategory::Power),
        Unit::Ampere => Some(SensorCategory::Current),
        Unit::Volt => Some(SensorCategory::Voltage),
        Unit::CubicMeter | Unit::Liter => Some(SensorCategory::Water),
        Unit::Percent => Some(SensorCategory::Humidity),
        Unit::Other(_) => None,
    }
}
