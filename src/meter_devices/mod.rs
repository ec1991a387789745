use log::debug;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::models::measurement::{Measurement, MeasurementLimits};
use crate::store::DataStore;
use crate::MeterError;

pub mod structs;

use structs::DeviceProfileFile;

/// Capabilities of a meter's hardware, shared read-only between all meters
/// using the same device model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "DeviceProfileFile")]
pub struct DeviceProfile {
    pub manufacturer: String,
    pub model: String,
    /// Seconds
    pub sample_period: f64,
    /// Seconds
    pub max_sample_period: f64,
    pub measurements: Vec<Measurement>,
    pub measurement_limits: HashMap<Measurement, MeasurementLimits>,
}

impl TryFrom<DeviceProfileFile> for DeviceProfile {
    type Error = String;

    fn try_from(file: DeviceProfileFile) -> Result<Self, Self::Error> {
        let mut measurements = Vec::with_capacity(file.measurements.len());
        let mut measurement_limits = HashMap::new();

        for entry in file.measurements {
            let measurement = Measurement::from_parts(&entry.physical_quantity, entry.ac_type)
                .ok_or_else(|| format!("unsupported measurement '{}' (type {:?})",
                                       entry.physical_quantity, entry.ac_type))?;

            if entry.lower_limit.is_some() || entry.upper_limit.is_some() {
                measurement_limits.insert(measurement, MeasurementLimits {
                    lower: entry.lower_limit,
                    upper: entry.upper_limit,
                });
            }
            measurements.push(measurement);
        }

        Ok(DeviceProfile {
            manufacturer: file.manufacturer,
            model: file.model,
            sample_period: file.sample_period,
            max_sample_period: file.max_sample_period.unwrap_or(file.sample_period),
            measurements,
            measurement_limits,
        })
    }
}

/// Catalog of device profiles keyed by device model name.
///
/// Updates are an additive merge: entries with the same name are replaced,
/// nothing is ever removed except by [`MeterDeviceRegistry::clear`].
#[derive(Debug, Default)]
pub struct MeterDeviceRegistry {
    devices: HashMap<String, Arc<DeviceProfile>>,
}

impl MeterDeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, new_profiles: HashMap<String, DeviceProfile>) {
        for (name, mut profile) in new_profiles {
            if profile.model.is_empty() {
                profile.model = name.clone();
            }
            debug!("Merging device profile {name}");
            self.devices.insert(name, Arc::new(profile));
        }
    }

    /// Merges the `meter_devices` section of the store's dataset root metadata.
    pub fn load_from_store(&mut self, store: &dyn DataStore) -> Result<(), MeterError> {
        let dataset_metadata = store.load_metadata("/")?;
        let devices = match dataset_metadata.get("meter_devices") {
            Some(v) => v.clone(),
            None => return Ok(()),
        };

        let profiles: HashMap<String, DeviceProfile> = serde_json::from_value(devices)
            .map_err(|e| MeterError::InvalidMetadata { key: "/".to_string(), source: e })?;
        self.update(profiles);
        Ok(())
    }

    pub fn lookup(&self, model: &str) -> Result<Arc<DeviceProfile>, MeterError> {
        self.devices
            .get(model)
            .cloned()
            .ok_or_else(|| MeterError::UnknownDevice(model.to_string()))
    }

    pub fn contains(&self, model: &str) -> bool {
        self.devices.contains_key(model)
    }

    pub fn models(&self) -> Vec<&str> {
        let mut models: Vec<&str> = self.devices.keys().map(|k| k.as_str()).collect();
        models.sort();
        models
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn clear(&mut self) {
        self.devices.clear();
    }
}

/// Parses a `meter_devices` mapping, mostly useful for building fixtures.
pub fn profiles_from_value(value: Value) -> Result<HashMap<String, DeviceProfile>, serde_json::Error> {
    serde_json::from_value(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::measurement::AcType;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn envir() -> Value {
        json!({
            "EnviR": {
                "manufacturer": "Current Cost",
                "model": "EnviR",
                "sample_period": 6,
                "max_sample_period": 300,
                "measurements": [
                    {"physical_quantity": "power", "type": "apparent", "lower_limit": 0, "upper_limit": 25000},
                    {"physical_quantity": "voltage"}
                ]
            }
        })
    }

    #[test]
    fn test_parse_profile() {
        let profiles = profiles_from_value(envir()).unwrap();
        let envir = &profiles["EnviR"];
        assert_eq!(envir.manufacturer, "Current Cost");
        assert_eq!(envir.sample_period, 6.0);
        assert_eq!(envir.max_sample_period, 300.0);
        assert_eq!(envir.measurements, vec![Measurement::Power(AcType::Apparent), Measurement::Voltage]);

        let limits = envir.measurement_limits[&Measurement::Power(AcType::Apparent)];
        assert_eq!(limits.lower, Some(0.0));
        assert_eq!(limits.upper, Some(25000.0));
        assert!(!envir.measurement_limits.contains_key(&Measurement::Voltage));
    }

    #[test]
    fn test_power_without_ac_type_is_rejected() {
        let value = json!({"Bad": {"sample_period": 1, "measurements": [{"physical_quantity": "power"}]}});
        assert!(profiles_from_value(value).is_err());
    }

    #[test]
    fn test_update_is_additive_and_overwrites() {
        let mut registry = MeterDeviceRegistry::new();
        registry.update(profiles_from_value(envir()).unwrap());

        let other = json!({
            "REDD_whole_house": {"sample_period": 1, "measurements": [{"physical_quantity": "power", "type": "apparent"}]},
            "EnviR": {"manufacturer": "Replaced", "sample_period": 10}
        });
        registry.update(profiles_from_value(other).unwrap());

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.models(), vec!["EnviR", "REDD_whole_house"]);
        assert_eq!(registry.lookup("EnviR").unwrap().manufacturer, "Replaced");
        /* model defaults to the catalog name */
        assert_eq!(registry.lookup("REDD_whole_house").unwrap().model, "REDD_whole_house");
        assert_eq!(registry.lookup("REDD_whole_house").unwrap().max_sample_period, 1.0);
    }

    #[test]
    fn test_lookup_unknown() {
        let registry = MeterDeviceRegistry::new();
        match registry.lookup("nope") {
            Err(MeterError::UnknownDevice(m)) => assert_eq!(m, "nope"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_load_from_store_is_idempotent() {
        let mut store = MemoryStore::new();
        store.insert("/", json!({"name": "D", "meter_devices": envir()}));

        let mut registry = MeterDeviceRegistry::new();
        registry.load_from_store(&store).unwrap();
        let first = registry.lookup("EnviR").unwrap();
        registry.load_from_store(&store).unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(*registry.lookup("EnviR").unwrap(), *first);
    }

    #[test]
    fn test_load_from_store_without_devices() {
        let mut store = MemoryStore::new();
        store.insert("/", json!({"name": "D"}));
        let mut registry = MeterDeviceRegistry::new();
        registry.load_from_store(&store).unwrap();
        assert!(registry.is_empty());
    }
}
