use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use std::fmt;
use std::sync::{Arc, Weak};

use crate::appliance::{Appliance, ApplianceId};
use crate::meter_devices::{DeviceProfile, MeterDeviceRegistry};
use crate::models::measurement::AcType;
use crate::models::{Key, MeterId, TimeFrame};
use crate::pipeline::{
    EnergyResults, LoadOptions, Node, Pipeline, PipelineExecutor, PipelineResults, ResultValue,
    ENERGY_RESULT, GOOD_SECTIONS_RESULT,
};
use crate::registry::MeterRegistry;
use crate::store::{DataStore, Metadata};
use crate::MeterError;

pub mod metadata;

pub use metadata::{MeterMetadata, Room};

/// A physical electricity meter.
///
/// The metadata, and with it the identity, can not be changed once the meter
/// exists; loading again replaces everything in one go.
#[derive(Debug, Clone, Default)]
pub struct ElectricityMeter {
    metadata: MeterMetadata,
    /// `keys[0]` carries the metadata, the rest are additional channels
    keys: Vec<String>,
    appliances: Vec<Appliance>,
    store: Option<Weak<dyn DataStore>>,
    /// Device profile as it was when the meter got loaded
    device: Option<Arc<DeviceProfile>>,
}

impl ElectricityMeter {
    pub fn new(metadata: MeterMetadata) -> Self {
        let appliances = metadata.appliances.iter().cloned().map(Appliance::new).collect();
        ElectricityMeter {
            metadata,
            appliances,
            ..Default::default()
        }
    }

    /// Builds a meter from the metadata stored under `key`.
    pub fn from_store(
        store: &Arc<dyn DataStore>,
        key: &str,
        devices: &mut MeterDeviceRegistry,
    ) -> Result<Self, MeterError> {
        let mut meter = ElectricityMeter::default();
        meter.load(store, key, devices)?;
        Ok(meter)
    }

    /// Loads metadata, additional channel keys, device profile and appliances
    /// for the primary `key`. On error the meter is left untouched.
    ///
    /// Device profiles found in the dataset root are merged into `devices`
    /// before this meter's profile is resolved. Registering the loaded meter is
    /// up to the caller, see [`MeterRegistry::register`].
    pub fn load(
        &mut self,
        store: &Arc<dyn DataStore>,
        key: &str,
        devices: &mut MeterDeviceRegistry,
    ) -> Result<(), MeterError> {
        if key.trim().is_empty() {
            return Err(MeterError::InvalidKey(key.to_string()));
        }
        info!("Loading ElectricityMeter from key {key}");

        let metadata = MeterMetadata::from_map(key, store.load_metadata(key)?)?;
        metadata.validate(key)?;

        let key_obj: Key = key.parse()?;
        if key_obj.meter.is_none() {
            return Err(MeterError::InvalidKey(key.to_string()));
        }

        let mut keys = vec![key.to_string()];
        for chan in metadata.additional_channels.iter() {
            keys.push(key_obj.with_meter(*chan).to_string());
        }

        devices.load_from_store(store.as_ref())?;
        /* validate() made sure the model is there */
        let device_model = metadata.device_model.as_deref().unwrap_or_default();
        let device = devices.lookup(device_model)?;

        let appliances: Vec<Appliance> = metadata.appliances.iter().cloned().map(Appliance::new).collect();
        debug!("Meter {key} has {} keys and {} appliances", keys.len(), appliances.len());

        self.metadata = metadata;
        self.keys = keys;
        self.appliances = appliances;
        self.store = Some(Arc::downgrade(store));
        self.device = Some(device);
        Ok(())
    }

    pub fn identifier(&self) -> MeterId {
        MeterId {
            instance: self.metadata.instance,
            building: self.metadata.building,
            dataset: self.metadata.dataset.clone(),
        }
    }

    pub fn metadata(&self) -> &MeterMetadata {
        &self.metadata
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn appliances(&self) -> &[Appliance] {
        &self.appliances
    }

    pub fn appliance_ids(&self) -> Vec<ApplianceId> {
        self.appliances.iter().map(|a| a.identifier()).collect()
    }

    /// The backing store, if one is attached and still alive.
    pub fn store(&self) -> Option<Arc<dyn DataStore>> {
        self.store.as_ref().and_then(|s| s.upgrade())
    }

    pub fn set_store(&mut self, store: &Arc<dyn DataStore>) {
        self.store = Some(Arc::downgrade(store));
    }

    pub fn is_site_meter(&self) -> bool {
        self.metadata.site_meter
    }

    /// Device profile resolved live against `devices`.
    pub fn device(&self, devices: &MeterDeviceRegistry) -> Result<Arc<DeviceProfile>, MeterError> {
        let model = self.metadata.device_model.as_deref().ok_or_else(|| MeterError::MissingMetadata {
            key: self.keys.first().cloned().unwrap_or_default(),
            field: "device_model",
        })?;
        devices.lookup(model)
    }

    /// Device profile captured by the last [`ElectricityMeter::load`].
    pub fn cached_device(&self) -> Option<&Arc<DeviceProfile>> {
        self.device.as_ref()
    }

    /// Seconds between two samples of this meter's device.
    pub fn sample_period(&self, devices: &MeterDeviceRegistry) -> Result<f64, MeterError> {
        Ok(self.device(devices)?.sample_period)
    }

    /// Identity of the meter directly upstream of this one.
    pub fn upstream_identifier(&self) -> Result<MeterId, MeterError> {
        let submeter_of = self.metadata.submeter_of.ok_or(MeterError::NoUpstream)?;
        if submeter_of < 1 {
            return Err(MeterError::InvalidTopology(submeter_of));
        }
        let instance = u32::try_from(submeter_of).map_err(|_| MeterError::InvalidTopology(submeter_of))?;

        let building = self.metadata.upstream_meter_in_building.or(self.metadata.building);
        Ok(MeterId {
            instance: Some(instance),
            building,
            dataset: self.metadata.dataset.clone(),
        })
    }

    pub fn upstream_meter(&self, registry: &MeterRegistry) -> Result<Arc<ElectricityMeter>, MeterError> {
        let id = self.upstream_identifier()?;
        registry.resolve(&id)
    }

    /// AC types of the power measurements of this meter's device, in the
    /// order the device lists them.
    pub fn available_ac_types(&self, devices: &MeterDeviceRegistry) -> Result<Vec<AcType>, MeterError> {
        let device = self.device(devices)?;
        Ok(device
            .measurements
            .iter()
            .filter(|m| m.is_power())
            .filter_map(|m| m.ac_type())
            .collect())
    }

    /// True if any appliance matches every key/value pair in `query`.
    pub fn matches(&self, query: &Metadata) -> bool {
        self.appliances.iter().any(|a| a.matches(query))
    }

    /// The appliance responsible for most of this meter's power draw.
    pub fn dominant_appliance(&self) -> Result<&Appliance, MeterError> {
        match self.appliances.len() {
            0 => Err(MeterError::NoAppliances),
            1 => Ok(&self.appliances[0]),
            n => self
                .appliances
                .iter()
                .find(|a| a.is_flagged_dominant())
                .ok_or(MeterError::AmbiguousDominantAppliance(n)),
        }
    }

    fn run_pipeline(
        &self,
        executor: &dyn PipelineExecutor,
        nodes: fn() -> Vec<Node>,
        options: &LoadOptions,
    ) -> Result<PipelineResults, MeterError> {
        /* checked before any node gets built */
        let store = self.store().ok_or(MeterError::StoreNotSet)?;
        let mut pipeline = Pipeline::new(nodes());
        pipeline.run(executor, self, store.as_ref(), options)?;
        Ok(pipeline.into_results())
    }

    pub fn total_energy(
        &self,
        executor: &dyn PipelineExecutor,
        options: &LoadOptions,
    ) -> Result<EnergyResults, MeterError> {
        let mut results = self.run_pipeline(executor, || vec![Node::Clip, Node::Energy], options)?;
        match results.remove(ENERGY_RESULT) {
            Some(ResultValue::Energy(energy)) => Ok(energy),
            _ => Err(MeterError::MissingResult(ENERGY_RESULT)),
        }
    }

    pub fn good_sections(&self, executor: &dyn PipelineExecutor) -> Result<Vec<TimeFrame>, MeterError> {
        let mut results = self.run_pipeline(executor, || vec![Node::LocateGoodSections], &LoadOptions::default())?;
        match results.remove(GOOD_SECTIONS_RESULT) {
            Some(ResultValue::GoodSections(sections)) => Ok(sections),
            _ => Err(MeterError::MissingResult(GOOD_SECTIONS_RESULT)),
        }
    }

    /// Share of `mains`' energy seen by this meter, both measured over the
    /// good sections of `mains`.
    pub fn proportion_of_energy(
        &self,
        mains: &ElectricityMeter,
        executor: &dyn PipelineExecutor,
    ) -> Result<f64, MeterError> {
        let sections = mains.good_sections(executor)?;
        if sections.is_empty() {
            /* nothing to measure over, mains energy is zero */
            return Err(MeterError::DivisionByZero);
        }
        let options = LoadOptions::with_timeframes(sections);
        let own = self.total_energy(executor, &options)?;
        let reference = mains.total_energy(executor, &options)?;

        let ac_type = own.common_ac_type(&reference).ok_or(MeterError::NoCommonAcType)?;
        let numerator = own.get(ac_type).unwrap_or_default();
        let denominator = reference.get(ac_type).unwrap_or_default();
        if denominator == 0.0 {
            return Err(MeterError::DivisionByZero);
        }
        Ok(numerator / denominator)
    }

    pub fn power_series(&self) -> Result<Vec<(DateTime<Utc>, f64)>, MeterError> {
        Err(MeterError::NotImplemented("power_series"))
    }

    pub fn voltage_series(&self) -> Result<Vec<(DateTime<Utc>, f64)>, MeterError> {
        Err(MeterError::NotImplemented("voltage_series"))
    }

    pub fn dropout_rate(&self) -> Result<f64, MeterError> {
        Err(MeterError::NotImplemented("dropout_rate"))
    }

    pub fn total_on_duration(&self) -> Result<Duration, MeterError> {
        Err(MeterError::NotImplemented("total_on_duration"))
    }

    pub fn on_durations(&self) -> Result<Vec<Duration>, MeterError> {
        Err(MeterError::NotImplemented("on_durations"))
    }

    pub fn activity_distribution(&self, _bin_size: Duration, _timespan: Duration) -> Result<Vec<f64>, MeterError> {
        Err(MeterError::NotImplemented("activity_distribution"))
    }

    pub fn when_on(&self) -> Result<Vec<(DateTime<Utc>, bool)>, MeterError> {
        Err(MeterError::NotImplemented("when_on"))
    }

    pub fn on_off_events(&self) -> Result<Vec<TimeFrame>, MeterError> {
        Err(MeterError::NotImplemented("on_off_events"))
    }

    pub fn discrete_appliance_activations(&self) -> Result<Vec<TimeFrame>, MeterError> {
        Err(MeterError::NotImplemented("discrete_appliance_activations"))
    }

    pub fn contiguous_sections(&self) -> Result<Vec<TimeFrame>, MeterError> {
        Err(MeterError::NotImplemented("contiguous_sections"))
    }

    pub fn clean_and_export(&self, _destination: &dyn DataStore) -> Result<(), MeterError> {
        Err(MeterError::NotImplemented("clean_and_export"))
    }

    pub fn save(&self, _destination: &dyn DataStore, _key: &str) -> Result<(), MeterError> {
        Err(MeterError::NotImplemented("save"))
    }
}

impl fmt::Display for ElectricityMeter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElectricityMeter(instance=")?;
        match self.metadata.instance {
            Some(instance) => write!(f, "{instance}")?,
            None => write!(f, "None")?,
        }
        write!(f, ", building=")?;
        match self.metadata.building {
            Some(building) => write!(f, "{building}")?,
            None => write!(f, "None")?,
        }
        match &self.metadata.dataset {
            Some(dataset) => write!(f, ", dataset='{dataset}'")?,
            None => write!(f, ", dataset=None")?,
        }

        if self.metadata.site_meter {
            write!(f, ", site_meter")?;
        }

        let appliances: Vec<String> = self.appliances.iter().map(|a| a.to_string()).collect();
        write!(f, ", appliances=[{}]", appliances.join(", "))?;

        if let Some(category) = &self.metadata.category {
            write!(f, ", category={category}")?;
        }
        if let Some(room) = &self.metadata.room {
            write!(f, ", room={}", room.name)?;
            if let Some(instance) = room.instance {
                write!(f, "{instance}")?;
            }
        }
        write!(f, ")")
    }
}
