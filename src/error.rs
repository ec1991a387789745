use thiserror::Error;

use crate::models::MeterId;
use crate::pipeline::PipelineError;
use crate::store::StoreError;

/// Errors raised while loading meters or resolving the metering topology.
///
/// Identity, topology and device errors are configuration defects of the
/// dataset and are never recovered from inside this crate.
#[derive(Error, Debug)]
pub enum MeterError {
    #[error("Device model '{0}' is not known to the device registry")]
    UnknownDevice(String),
    #[error("No meter registered under {0}")]
    UnknownMeter(MeterId),
    #[error("This meter has no 'submeter_of' metadata attribute")]
    NoUpstream,
    #[error("'submeter_of' must be >= 1, got {0}")]
    InvalidTopology(i64),
    #[error("'meter.store' is not set! Cannot process data without a DataStore")]
    StoreNotSet,
    #[error("Energy of the reference meter is zero")]
    DivisionByZero,
    #[error("{0} is not implemented")]
    NotImplemented(&'static str),

    #[error("Invalid key '{0}'")]
    InvalidKey(String),
    #[error("Metadata for '{key}' is missing required field '{field}'")]
    MissingMetadata { key: String, field: &'static str },
    #[error("Metadata for '{key}' has '{field}' = {value}, must be >= 1")]
    OutOfRange { key: String, field: &'static str, value: u32 },
    #[error("Metadata for '{key}' can not be parsed: {source}")]
    InvalidMetadata {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("Pipeline did not produce a '{0}' result")]
    MissingResult(&'static str),
    #[error("Meters share no AC type to compare energies")]
    NoCommonAcType,
    #[error("Meter has no appliances")]
    NoAppliances,
    #[error("Meter has {0} appliances and none is flagged as dominant")]
    AmbiguousDominantAppliance(usize),
}
