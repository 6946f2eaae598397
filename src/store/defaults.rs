use std::path::PathBuf;
use std::sync::Mutex;

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{PackError, Result};
use crate::store::fs_ext;

/// Key-value store shared between the processes that use one store root.
///
/// Writers replace several keys in one go so a reader never sees half of an update.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;

    /// Reads several keys from one consistent snapshot, in the order asked for.
    fn get_many(&self, keys: &[&str]) -> Vec<Option<Value>>;

    fn set_all(&self, entries: Vec<(&str, Value)>) -> Result<()>;

    fn remove_all(&self, keys: &[&str]) -> Result<()>;
}

/// [`KeyValueStore`] kept as a single JSON object on disk.
pub struct JsonDefaults {
    path: PathBuf,
    // serializes our own read-modify-write cycles; other processes are not coordinated
    lock: Mutex<()>,
}

impl JsonDefaults {
    pub fn new(path: PathBuf) -> Self {
        Self { path, lock: Mutex::new(()) }
    }

    fn read(&self) -> Map<String, Value> {
        let data = match fs_ext::read_optional(&self.path) {
            Ok(Some(data)) => data,
            Ok(None) => return Map::new(),
            Err(e) => {
                warn!("Treating shared defaults as empty: {}", e);
                return Map::new();
            }
        };
        match serde_json::from_slice::<Map<String, Value>>(&data) {
            Ok(map) => map,
            Err(e) => {
                warn!("Shared defaults at {} are corrupt, treating as empty: {}", self.path.display(), e);
                Map::new()
            }
        }
    }

    fn write(&self, map: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs_ext::ensure_dir(parent)?;
        }
        let data = serde_json::to_vec_pretty(map)
            .map_err(|e| PackError::Decode(format!("Failed to serialize shared defaults: {}", e)))?;
        fs_ext::write_atomic(&self.path, &data)
    }

    fn update(&self, f: impl FnOnce(&mut Map<String, Value>)) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut map = self.read();
        f(&mut map);
        self.write(&map)
    }
}

impl KeyValueStore for JsonDefaults {
    fn get(&self, key: &str) -> Option<Value> {
        self.read().remove(key)
    }

    fn get_many(&self, keys: &[&str]) -> Vec<Option<Value>> {
        let mut map = self.read();
        keys.iter().map(|key| map.remove(*key)).collect()
    }

    fn set_all(&self, entries: Vec<(&str, Value)>) -> Result<()> {
        self.update(|map| {
            for (key, value) in entries {
                map.insert(key.to_string(), value);
            }
        })
    }

    fn remove_all(&self, keys: &[&str]) -> Result<()> {
        self.update(|map| {
            for key in keys {
                map.remove(*key);
            }
        })
    }
}
