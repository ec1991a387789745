use serde::{Deserialize, Serialize};
use std::fmt;

/// Alternating-current variant of a power or energy measurement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AcType {
    Active,
    Apparent,
    Reactive,
}

impl AcType {
    /// Preference order used when two meters have to be compared.
    pub const PREFERENCE: [AcType; 3] = [AcType::Active, AcType::Apparent, AcType::Reactive];

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(AcType::Active),
            "apparent" => Some(AcType::Apparent),
            "reactive" => Some(AcType::Reactive),
            _ => None,
        }
    }

    pub fn to_string(&self) -> String {
        match self {
            AcType::Active => "active".to_string(),
            AcType::Apparent => "apparent".to_string(),
            AcType::Reactive => "reactive".to_string(),
        }
    }
}

/// A physical quantity a meter device is able to record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Measurement {
    Power(AcType),
    Energy(AcType),
    Voltage,
    Current,
    Frequency,
    PowerFactor,
    State,
}

impl Measurement {
    /// Builds a measurement from the `physical_quantity` / `type` pair used in
    /// dataset metadata. Power and energy require an AC type.
    pub fn from_parts(physical_quantity: &str, ac_type: Option<AcType>) -> Option<Self> {
        match (physical_quantity, ac_type) {
            ("power", Some(ac)) => Some(Measurement::Power(ac)),
            ("energy", Some(ac)) => Some(Measurement::Energy(ac)),
            ("voltage", _) => Some(Measurement::Voltage),
            ("current", _) => Some(Measurement::Current),
            ("frequency", _) => Some(Measurement::Frequency),
            ("pf" | "power factor", _) => Some(Measurement::PowerFactor),
            ("state", _) => Some(Measurement::State),
            _ => None,
        }
    }

    pub fn is_power(&self) -> bool {
        matches!(self, Measurement::Power(_))
    }

    pub fn ac_type(&self) -> Option<AcType> {
        match self {
            Measurement::Power(ac) | Measurement::Energy(ac) => Some(*ac),
            _ => None,
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Measurement::Power(ac) => write!(f, "Power({})", ac.to_string()),
            Measurement::Energy(ac) => write!(f, "Energy({})", ac.to_string()),
            Measurement::Voltage => write!(f, "Voltage"),
            Measurement::Current => write!(f, "Current"),
            Measurement::Frequency => write!(f, "Frequency"),
            Measurement::PowerFactor => write!(f, "PowerFactor"),
            Measurement::State => write!(f, "State"),
        }
    }
}

/// Plausible value range of a measurement, either bound may be open.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct MeasurementLimits {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}
