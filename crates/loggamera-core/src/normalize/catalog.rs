// ── Sensor catalogue ──
//
// Hand-maintained mappings for sensor ids observed in the field. Numeric ids
// are `RawData` register numbers; named ids come from the dedicated class
// endpoints.

use crate::model::{CatalogEntry, SensorCategory, StateClass, Unit, ValueKind};

use SensorCategory as C;
use StateClass as S;

const fn numeric(
    id: &'static str,
    name: &'static str,
    category: SensorCategory,
    unit: Unit,
    state_class: StateClass,
) -> CatalogEntry {
    CatalogEntry {
        id,
        name,
        category,
        unit: Some(unit),
        state_class: Some(state_class),
        kind: ValueKind::Numeric,
    }
}

const fn flag(id: &'static str, name: &'static str, category: SensorCategory) -> CatalogEntry {
    CatalogEntry {
        id,
        name,
        category,
        unit: None,
        state_class: None,
        kind: ValueKind::Boolean,
    }
}

static CATALOG: [CatalogEntry; 40] = [
    // PowerMeter
    numeric(
        "ConsumedTotalInkWh",
        "Total Energy Consumption",
        C::Energy,
        Unit::KilowattHour,
        S::TotalIncreasing,
    ),
    numeric("PowerInkW", "Current Energy Consumption", C::Power, Unit::Kilowatt, S::Measurement),
    flag("alarmActive", "Alarm Status", C::Alarm),
    CatalogEntry {
        id: "alarmInClearText",
        name: "Alarm Context",
        category: C::Alarm,
        unit: None,
        state_class: None,
        kind: ValueKind::Text,
    },
    // RawData energy and power registers
    numeric("544352", "Total Energy Consumed", C::Energy, Unit::KilowattHour, S::TotalIncreasing),
    numeric("544353", "Total Energy Interval", C::Energy, Unit::KilowattHour, S::Measurement),
    numeric("544399", "Power", C::Power, Unit::Watt, S::Measurement),
    numeric("544463", "Energy Phase 1", C::Energy, Unit::KilowattHour, S::TotalIncreasing),
    numeric("544464", "Energy Phase 2", C::Energy, Unit::KilowattHour, S::TotalIncreasing),
    numeric("544465", "Energy Phase 3", C::Energy, Unit::KilowattHour, S::TotalIncreasing),
    numeric("544391", "Current Phase 1", C::Current, Unit::Ampere, S::Measurement),
    numeric("544393", "Current Phase 2", C::Current, Unit::Ampere, S::Measurement),
    numeric("544394", "Current Phase 3", C::Current, Unit::Ampere, S::Measurement),
    numeric("544395", "Voltage Phase 1", C::Voltage, Unit::Volt, S::Measurement),
    numeric("544396", "Voltage Phase 2", C::Voltage, Unit::Volt, S::Measurement),
    numeric("544397", "Voltage Phase 3", C::Voltage, Unit::Volt, S::Measurement),
    numeric("549990", "Total Energy Generated", C::Energy, Unit::KilowattHour, S::TotalIncreasing),
    numeric("550224", "Energy Generated Interval", C::Energy, Unit::KilowattHour, S::Measurement),
    numeric("550205", "Power Phase 1", C::Power, Unit::Watt, S::Measurement),
    numeric("550206", "Power Phase 2", C::Power, Unit::Watt, S::Measurement),
    numeric("550207", "Power Phase 3", C::Power, Unit::Watt, S::Measurement),
    // RawData heat pump registers
    numeric("541388", "Hot Water Temperature", C::Temperature, Unit::Celsius, S::Measurement),
    numeric("541125", "Set Room Temperature", C::Temperature, Unit::Celsius, S::Measurement),
    numeric("541119", "Outdoor Temperature", C::Temperature, Unit::Celsius, S::Measurement),
    numeric("541655", "Hot Gas Temperature", C::Temperature, Unit::Celsius, S::Measurement),
    numeric("541104", "Heat Carrier 1", C::Temperature, Unit::Celsius, S::Measurement),
    numeric("541646", "Heat Carrier Outgoing", C::Temperature, Unit::Celsius, S::Measurement),
    numeric("541647", "Heat Carrier Incoming", C::Temperature, Unit::Celsius, S::Measurement),
    numeric("541651", "Brine Incoming", C::Temperature, Unit::Celsius, S::Measurement),
    numeric("541648", "Brine Outgoing", C::Temperature, Unit::Celsius, S::Measurement),
    // HeatPump endpoint
    numeric(
        "heatCarrierInTempInDeg",
        "Heat Carrier Inlet Temperature",
        C::Temperature,
        Unit::Celsius,
        S::Measurement,
    ),
    numeric(
        "heatCarrierOutTempInDeg",
        "Heat Carrier Outlet Temperature",
        C::Temperature,
        Unit::Celsius,
        S::Measurement,
    ),
    numeric(
        "brineInTempInDeg",
        "Brine Inlet Temperature",
        C::Temperature,
        Unit::Celsius,
        S::Measurement,
    ),
    numeric(
        "brineOutTempInDeg",
        "Brine Outlet Temperature",
        C::Temperature,
        Unit::Celsius,
        S::Measurement,
    ),
    flag("reducedModeActive", "Reduced Mode", C::Status),
    flag("pumpActivity", "Pump Activity", C::Status),
    flag("filterAlarmIsActive", "Filter Alarm", C::Alarm),
    // RoomSensor
    numeric("TemperatureInC", "Temperature", C::Temperature, Unit::Celsius, S::Measurement),
    numeric("HumidityInRH", "Humidity", C::Humidity, Unit::Percent, S::Measurement),
    // WaterMeter
    numeric(
        "ConsumedSinceMidnightInLiters",
        "Water Used Since Midnight",
        C::Water,
        Unit::Liter,
        S::TotalIncreasing,
    ),
];

/// `ConsumedTotalInm3` is reported with either case of `M`; both ids share
/// one entry.
static WATER_TOTAL: CatalogEntry = numeric(
    "ConsumedTotalInm3",
    "Total Water Consumption",
    C::Water,
    Unit::CubicMeter,
    S::TotalIncreasing,
);

/// Known vendor display-name defects: `(sensor id, defective text, fix)`.
static CORRECTIONS: [(&str, &str, &str); 3] = [
    ("TemperatureInC", "Temprature", "Temperature"),
    ("HumidityInRH", "Humidty", "Humidity"),
    ("PowerInkW", "Effect", "Power"),
];

pub fn lookup(id: &str) -> Option<&'static CatalogEntry> {
    if id.eq_ignore_ascii_case("ConsumedTotalInm3") {
        return Some(&WATER_TOTAL);
    }
    CATALOG.iter().find(|entry| entry.id == id)
}

/// Every catalogued entry.
pub fn entries() -> impl Iterator<Item = &'static CatalogEntry> {
    CATALOG.iter().chain(std::iter::once(&WATER_TOTAL))
}

/// The corrected display name when `vendor_name` is a known defect for `id`.
///
/// Matches the defective text exactly (after trimming), so a vendor-side fix
/// passes through untouched.
pub fn correct_name(id: &str, vendor_name: &str) -> Option<&'static str> {
    let vendor_name = vendor_name.trim();
    CORRECTIONS
        .iter()
        .find(|(sensor, defect, _)| *sensor == id && *defect == vendor_name)
        .map(|(_, _, fix)| *fix)
}
