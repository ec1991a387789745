use serde::Deserialize;

use crate::models::measurement::AcType;

/// One entry of a device's `measurements` list as written in dataset metadata,
/// e.g. `{physical_quantity: power, type: active, lower_limit: 0, upper_limit: 3000}`.
#[derive(Debug, Clone, Deserialize)]
pub struct MeasurementEntry {
    pub physical_quantity: String,
    #[serde(rename = "type", default)]
    pub ac_type: Option<AcType>,
    #[serde(default)]
    pub lower_limit: Option<f64>,
    #[serde(default)]
    pub upper_limit: Option<f64>,
}

/// A device profile as found below `meter_devices` in the dataset root metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceProfileFile {
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub model: String,
    pub sample_period: f64,
    #[serde(default)]
    pub max_sample_period: Option<f64>,
    #[serde(default)]
    pub measurements: Vec<MeasurementEntry>,
}
