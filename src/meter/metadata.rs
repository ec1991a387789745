use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::appliance::ApplianceMetadata;
use crate::store::Metadata;
use crate::MeterError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<u32>,
}

/// Metadata of a single meter.
///
/// `instance`, `building`, `dataset` and `device_model` are required once a
/// meter is loaded from a store; a meter built in memory may leave them out.
/// Keys this struct does not know about end up in `extra` untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeterMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub building: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_model: Option<String>,
    /// Instance of the upstream meter, must be >= 1 when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submeter_of: Option<i64>,
    /// Building of the upstream meter, defaults to our own building
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_meter_in_building: Option<u32>,
    #[serde(default)]
    pub site_meter: bool,
    #[serde(default)]
    pub additional_channels: Vec<u32>,
    #[serde(default)]
    pub appliances: Vec<ApplianceMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<Room>,
    #[serde(flatten)]
    pub extra: Metadata,
}

impl MeterMetadata {
    pub fn from_map(key: &str, map: Metadata) -> Result<Self, MeterError> {
        serde_json::from_value(Value::Object(map))
            .map_err(|e| MeterError::InvalidMetadata { key: key.to_string(), source: e })
    }

    /// Checks the fields every stored meter has to carry.
    pub fn validate(&self, key: &str) -> Result<(), MeterError> {
        let missing = |field: &'static str| MeterError::MissingMetadata { key: key.to_string(), field };

        if self.instance.is_none() {
            return Err(missing("instance"));
        }
        if self.building.is_none() {
            return Err(missing("building"));
        }
        if self.dataset.is_none() {
            return Err(missing("dataset"));
        }
        if self.device_model.is_none() {
            return Err(missing("device_model"));
        }

        let numbered = [
            ("instance", self.instance),
            ("building", self.building),
            ("upstream_meter_in_building", self.upstream_meter_in_building),
        ];
        for (field, value) in numbered {
            if value == Some(0) {
                return Err(MeterError::OutOfRange { key: key.to_string(), field, value: 0 });
            }
        }
        Ok(())
    }
}
