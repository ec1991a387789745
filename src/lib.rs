//! Electricity meter identity and topology resolution
//!
//! This library loads meters of an energy disaggregation dataset from a
//! metadata store, resolves where each meter sits in the site meter →
//! sub-meter → appliance hierarchy and hands analysis work to an external
//! pipeline engine.

pub mod appliance;
pub mod config;
pub mod error;
pub mod meter;
pub mod meter_devices;
pub mod models;
pub mod pipeline;
pub mod registry;
pub mod store;
pub mod topology;

// Re-export common types for easier access
pub use appliance::{Appliance, ApplianceId};
pub use config::Config;
pub use error::MeterError;
pub use meter::{ElectricityMeter, MeterMetadata};
pub use meter_devices::{DeviceProfile, MeterDeviceRegistry};
pub use models::measurement::{AcType, Measurement};
pub use models::{Key, MeterId, TimeFrame};
pub use pipeline::{LoadOptions, Node, Pipeline, PipelineExecutor, PipelineResults};
pub use registry::MeterRegistry;
pub use store::{DataStore, MemoryStore};
#[cfg(feature = "yaml-store")]
pub use store::yaml::YamlStore;
pub use topology::MeterTopology;
