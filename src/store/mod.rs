use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

use crate::models::Key;

#[cfg(feature = "yaml-store")]
pub mod yaml;

/// Open key/value metadata as handed out by a store.
pub type Metadata = serde_json::Map<String, Value>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("No metadata stored under '{0}'")]
    NotFound(String),
    #[error("Metadata under '{0}' is not a mapping")]
    NotAMapping(String),
    #[error("Unable to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Unable to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yml::Error,
    },
}

/// Persistent metadata source for a dataset.
///
/// `/` addresses the dataset root (which carries `meter_devices`), any other
/// key addresses a single meter.
pub trait DataStore {
    fn load_metadata(&self, key: &str) -> Result<Metadata, StoreError>;

    /// All meter keys of the dataset, ordered by building and meter number.
    fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// Orders meter keys by (building, meter) and drops anything that is not a
/// meter address.
pub(crate) fn sort_meter_keys<I: IntoIterator<Item = String>>(keys: I) -> Vec<String> {
    let mut parsed: Vec<(u32, u32, String)> = keys
        .into_iter()
        .filter_map(|k| {
            let key: Key = k.parse().ok()?;
            Some((key.building?, key.meter?, k))
        })
        .collect();
    parsed.sort();
    parsed.into_iter().map(|(_, _, k)| k).collect()
}

/// Store keeping all metadata in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, metadata: Value) {
        self.entries.insert(key.to_string(), metadata);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    /// Copies the dataset root and every meter of `source` into memory.
    pub fn snapshot(source: &dyn DataStore) -> Result<Self, StoreError> {
        let mut store = MemoryStore::new();
        store.insert("/", Value::Object(source.load_metadata("/")?));
        for key in source.keys()? {
            let metadata = source.load_metadata(&key)?;
            store.insert(&key, Value::Object(metadata));
        }
        Ok(store)
    }
}

impl DataStore for MemoryStore {
    fn load_metadata(&self, key: &str) -> Result<Metadata, StoreError> {
        match self.entries.get(key) {
            Some(Value::Object(map)) => Ok(map.clone()),
            Some(_) => Err(StoreError::NotAMapping(key.to_string())),
            None => Err(StoreError::NotFound(key.to_string())),
        }
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(sort_meter_keys(self.entries.keys().cloned()))
    }
}
