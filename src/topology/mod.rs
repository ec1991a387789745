use log::{info, warn};
use std::sync::Arc;

use crate::meter::{ElectricityMeter, MeterMetadata};
use crate::meter_devices::{DeviceProfile, MeterDeviceRegistry};
use crate::models::measurement::AcType;
use crate::models::{Key, MeterId};
use crate::registry::MeterRegistry;
use crate::store::DataStore;
use crate::MeterError;

/// Device catalog and meter registry of one dataset load.
///
/// Loads are not synchronised; one topology is meant to be filled by a single
/// load sequence. Use [`MeterTopology::clear`] or a fresh topology per dataset
/// to avoid stale identities aliasing new meters.
#[derive(Debug, Default)]
pub struct MeterTopology {
    devices: MeterDeviceRegistry,
    meters: MeterRegistry,
}

impl MeterTopology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn devices(&self) -> &MeterDeviceRegistry {
        &self.devices
    }

    pub fn devices_mut(&mut self) -> &mut MeterDeviceRegistry {
        &mut self.devices
    }

    pub fn meters(&self) -> &MeterRegistry {
        &self.meters
    }

    /// Registers a meter built from in-memory metadata.
    pub fn add_meter(&mut self, metadata: MeterMetadata) -> Arc<ElectricityMeter> {
        self.meters.register(ElectricityMeter::new(metadata))
    }

    pub fn load_meter(&mut self, store: &Arc<dyn DataStore>, key: &str) -> Result<Arc<ElectricityMeter>, MeterError> {
        let meter = ElectricityMeter::from_store(store, key, &mut self.devices)?;
        Ok(self.meters.register(meter))
    }

    /// Loads `key` again for the meter registered as `previous`. If the
    /// stored identity changed, the old registration is removed.
    pub fn reload_meter(
        &mut self,
        previous: &MeterId,
        store: &Arc<dyn DataStore>,
        key: &str,
    ) -> Result<Arc<ElectricityMeter>, MeterError> {
        let meter = ElectricityMeter::from_store(store, key, &mut self.devices)?;
        let id = meter.identifier();
        if &id != previous && self.meters.deregister(previous).is_some() {
            warn!("Meter {key} moved from {previous} to {id}, dropped old registration");
        }
        Ok(self.meters.register(meter))
    }

    /// Loads every meter of `store`, limited to `buildings` unless that is empty.
    pub fn load_all(
        &mut self,
        store: &Arc<dyn DataStore>,
        buildings: &[u32],
    ) -> Result<Vec<Arc<ElectricityMeter>>, MeterError> {
        let mut loaded = Vec::new();
        for key in store.keys()? {
            let parsed: Key = key.parse()?;
            if !buildings.is_empty() && !parsed.building.map_or(false, |b| buildings.contains(&b)) {
                continue;
            }
            loaded.push(self.load_meter(store, &key)?);
        }
        info!("Loaded {} meters, {} device profiles known", loaded.len(), self.devices.len());
        Ok(loaded)
    }

    pub fn upstream_of(&self, meter: &ElectricityMeter) -> Result<Arc<ElectricityMeter>, MeterError> {
        meter.upstream_meter(&self.meters)
    }

    pub fn device_of(&self, meter: &ElectricityMeter) -> Result<Arc<DeviceProfile>, MeterError> {
        meter.device(&self.devices)
    }

    pub fn available_ac_types(&self, meter: &ElectricityMeter) -> Result<Vec<AcType>, MeterError> {
        meter.available_ac_types(&self.devices)
    }

    pub fn clear(&mut self) {
        self.devices.clear();
        self.meters.clear();
    }
}
