use log::{debug, info};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::{sort_meter_keys, DataStore, Metadata, StoreError};
use crate::models::Key;

const DATASET_FILE: &str = "dataset.yaml";

/// Store reading metadata from a directory of YAML files.
///
/// The dataset root `/` lives in `<root>/dataset.yaml`, a meter key such as
/// `/building1/elec/meter2` in `<root>/building1/elec/meter2.yaml`.
#[derive(Debug, Clone)]
pub struct YamlStore {
    root: PathBuf,
}

impl YamlStore {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        if !root.join(DATASET_FILE).is_file() {
            return Err(StoreError::NotFound(root.join(DATASET_FILE).display().to_string()));
        }
        info!("Opened YAML store at {}", root.display());
        Ok(YamlStore { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        /* only well formed keys are mapped so nothing escapes the root */
        let parsed: Key = key.parse().map_err(|_| StoreError::NotFound(key.to_string()))?;
        if parsed.is_root() {
            return Ok(self.root.join(DATASET_FILE));
        }
        Ok(self.root.join(format!("{}.yaml", parsed.to_string().trim_start_matches('/'))))
    }
}

impl DataStore for YamlStore {
    fn load_metadata(&self, key: &str) -> Result<Metadata, StoreError> {
        let path = self.path_for(key)?;
        debug!("Loading metadata for {key} from {}", path.display());

        if !path.is_file() {
            return Err(StoreError::NotFound(key.to_string()));
        }
        let contents = fs::read_to_string(&path)
            .map_err(|e| StoreError::Io { path: path.display().to_string(), source: e })?;
        let value: Value = serde_yml::from_str(&contents)
            .map_err(|e| StoreError::Parse { path: path.display().to_string(), source: e })?;

        match value {
            Value::Object(map) => Ok(map),
            Value::Null => Ok(Metadata::new()),
            _ => Err(StoreError::NotAMapping(key.to_string())),
        }
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        for entry in WalkDir::new(&self.root) {
            let entry = entry.map_err(|e| StoreError::Io {
                path: e.path().unwrap_or(self.root.as_path()).display().to_string(),
                source: e.into(),
            })?;
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            let relative = match path.strip_prefix(&self.root) {
                Ok(r) => r.with_extension(""),
                Err(_) => continue,
            };
            let parts: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .collect();
            keys.push(format!("/{}", parts.join("/")));
        }
        Ok(sort_meter_keys(keys))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, contents: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_open_requires_dataset_file() {
        let dir = TempDir::new().unwrap();
        assert!(YamlStore::open(dir.path()).is_err());
        write(dir.path(), "dataset.yaml", "name: REDD\n");
        assert!(YamlStore::open(dir.path()).is_ok());
    }

    #[test]
    fn test_load_and_list() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "dataset.yaml", "name: REDD\n");
        write(dir.path(), "building1/elec/meter1.yaml", "instance: 1\nbuilding: 1\n");
        write(dir.path(), "building1/elec/meter12.yaml", "instance: 12\n");
        write(dir.path(), "building1/elec/meter3.yaml", "instance: 3\n");
        write(dir.path(), "building1/notes.txt", "ignored");

        let store = YamlStore::open(dir.path()).unwrap();
        assert_eq!(store.load_metadata("/").unwrap()["name"], "REDD");
        assert_eq!(store.load_metadata("/building1/elec/meter1").unwrap()["instance"], 1);
        assert_eq!(store.keys().unwrap(), vec![
            "/building1/elec/meter1".to_string(),
            "/building1/elec/meter3".to_string(),
            "/building1/elec/meter12".to_string(),
        ]);
    }

    #[test]
    fn test_missing_and_malformed() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "dataset.yaml", "name: REDD\n");
        write(dir.path(), "building1/elec/meter1.yaml", "- 1\n- 2\n");
        write(dir.path(), "building1/elec/meter2.yaml", "instance: [1\n");

        let store = YamlStore::open(dir.path()).unwrap();
        assert!(matches!(store.load_metadata("/building1/elec/meter9"), Err(StoreError::NotFound(_))));
        assert!(matches!(store.load_metadata("/building1/elec/meter1"), Err(StoreError::NotAMapping(_))));
        assert!(matches!(store.load_metadata("/building1/elec/meter2"), Err(StoreError::Parse { .. })));
        assert!(matches!(store.load_metadata("/../etc/passwd"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_listing_a_vanished_tree_fails() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "dataset.yaml", "name: REDD\n");
        write(dir.path(), "building1/elec/meter1.yaml", "instance: 1\n");
        let store = YamlStore::open(dir.path()).unwrap();

        fs::remove_dir_all(dir.path()).unwrap();
        match store.keys() {
            Err(StoreError::Io { path, .. }) => assert_eq!(path, dir.path().display().to_string()),
            other => panic!("unexpected {other:?}"),
        }
    }
}
