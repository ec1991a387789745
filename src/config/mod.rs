use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const LOG_LEVEL_ENV: &str = "TOPOLOGY_LOG_LEVEL";

const CONFIG_PATHS: [&str; 2] = ["config/topology.yaml", "topology.yaml"];

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Read every file on demand
    Yaml,
    /// Read the directory once and serve from memory
    Memory,
}

fn store_path_default() -> String { return "data".to_string() }
fn store_kind_default() -> StoreKind { return StoreKind::Yaml }

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct StoreConfig {
    /// Directory holding `dataset.yaml` and the per building meter files
    #[serde(default="store_path_default")]
    pub path: String,
    #[serde(default="store_kind_default")]
    pub kind: StoreKind,
}

fn store_default() -> StoreConfig { return StoreConfig { path: store_path_default(), kind: store_kind_default() } }
fn log_level_default() -> String { return "info".to_string() }
fn buildings_default() -> Vec<u32> { return Vec::new() }

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Config {
    #[serde(default="store_default")]
    pub store: StoreConfig,
    #[serde(default="log_level_default")]
    pub log_level: String,
    /// Buildings to load, empty loads all of them
    #[serde(default="buildings_default")]
    pub buildings: Vec<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            store: store_default(),
            log_level: log_level_default(),
            buildings: buildings_default(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unable to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Unable to parse config: {0}")]
    Parse(#[from] serde_yml::Error),
}

impl Config {
    /// Reads `config/topology.yaml` or `topology.yaml`, whichever exists
    /// first. Without any config file the defaults are used.
    pub fn load() -> Result<Self, ConfigError> {
        for path in CONFIG_PATHS {
            if Path::new(path).is_file() {
                return Config::load_from(path);
            }
        }
        info!("No config file found, using defaults");
        Ok(Config::default())
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("Reading config from {}", path.display());
        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io { path: path.display().to_string(), source: e })?;
        Config::from_str(&contents)
    }

    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        /* an empty file is a valid config with all defaults */
        if contents.trim().is_empty() {
            return Ok(Config::default());
        }
        Ok(serde_yml::from_str(contents)?)
    }

    /// Log filter, the environment wins over the config file.
    pub fn log_filter(&self) -> String {
        match std::env::var(LOG_LEVEL_ENV) {
            Ok(level) if !level.trim().is_empty() => level,
            _ => self.log_level.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let c = Config::from_str("").unwrap();
        assert_eq!(c, Config::default());
        assert_eq!(c.store.path, "data");
        assert_eq!(c.store.kind, StoreKind::Yaml);
        assert_eq!(c.log_level, "info");
        assert!(c.buildings.is_empty());
    }

    #[test]
    fn test_partial_config() {
        let c = Config::from_str("store:\n  path: /srv/redd\nbuildings: [1, 3]\n").unwrap();
        assert_eq!(c.store.path, "/srv/redd");
        assert_eq!(c.buildings, vec![1, 3]);
        assert_eq!(c.log_level, "info");

        let c = Config::from_str("store: {}\nlog_level: debug\n").unwrap();
        assert_eq!(c.store.path, "data");
        assert_eq!(c.log_level, "debug");
    }

    #[test]
    fn test_store_kind() {
        let c = Config::from_str("store:\n  kind: memory\n").unwrap();
        assert_eq!(c.store.kind, StoreKind::Memory);
        assert_eq!(c.store.path, "data");

        let c = Config::from_str("store:\n  path: /srv/redd\n").unwrap();
        assert_eq!(c.store.kind, StoreKind::Yaml);
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(Config::from_str("buildings: one"), Err(ConfigError::Parse(_))));
        assert!(matches!(Config::from_str("store:\n  kind: sqlite\n"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("topology.yaml");
        fs::write(&path, "log_level: warn\n").unwrap();
        assert_eq!(Config::load_from(&path).unwrap().log_level, "warn");
        assert!(matches!(Config::load_from(dir.path().join("missing.yaml")), Err(ConfigError::Io { .. })));
    }
}
