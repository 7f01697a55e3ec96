use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Result, TrackerError};

/// Device-local key-value persistence surviving process restart.
///
/// Only the offline queue and the last selected operation day live here.
pub trait LocalStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// `LocalStore` backed by one JSON file of string pairs.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl JsonFileStore {
    /// Storage file lives at `<data_dir>/local_store.json`.
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("local_store.json"),
            guard: Mutex::new(()),
        }
    }

    fn read_map(&self) -> Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let raw = fs::read_to_string(&self.path)
            .map_err(|e| TrackerError::store(format!("failed to read local store: {e}")))?;
        serde_json::from_str(&raw)
            .map_err(|e| TrackerError::store(format!("corrupt local store file: {e}")))
    }

    fn write_map(&self, map: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| TrackerError::store(format!("failed to create data dir: {e}")))?;
        }
        let raw = serde_json::to_string_pretty(map)
            .map_err(|e| TrackerError::store(format!("failed to encode local store: {e}")))?;
        fs::write(&self.path, raw)
            .map_err(|e| TrackerError::store(format!("failed to write local store: {e}")))
    }

    fn locked(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.guard
            .lock()
            .map_err(|e| TrackerError::store(format!("local store lock poisoned: {e}")))
    }
}

impl LocalStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.locked()?;
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.locked()?;
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.locked()?;
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

/// Volatile `LocalStore` for tests and ephemeral embedders.
#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    map: Mutex<HashMap<String, String>>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryLocalStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let map = self
            .map
            .lock()
            .map_err(|e| TrackerError::store(format!("local store lock poisoned: {e}")))?;
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut map = self
            .map
            .lock()
            .map_err(|e| TrackerError::store(format!("local store lock poisoned: {e}")))?;
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut map = self
            .map
            .lock()
            .map_err(|e| TrackerError::store(format!("local store lock poisoned: {e}")))?;
        map.remove(key);
        Ok(())
    }
}

/// Read a stored JSON value, treating a missing or corrupt entry as absent.
pub fn get_json_lenient(store: &dyn LocalStore, key: &str) -> Option<Value> {
    match store.get(key) {
        Ok(Some(raw)) => serde_json::from_str(&raw).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        assert_eq!(store.get("missing").unwrap(), None);

        store.set("turnstile_operation_date", "05/03/2024").unwrap();
        assert_eq!(
            store.get("turnstile_operation_date").unwrap().as_deref(),
            Some("05/03/2024")
        );

        // A second handle over the same file sees the persisted value
        let reopened = JsonFileStore::new(dir.path());
        assert_eq!(
            reopened.get("turnstile_operation_date").unwrap().as_deref(),
            Some("05/03/2024")
        );

        reopened.remove("turnstile_operation_date").unwrap();
        assert_eq!(store.get("turnstile_operation_date").unwrap(), None);
    }

    #[test]
    fn test_lenient_json_read() {
        let store = MemoryLocalStore::new();
        store.set("queue", "not json at all").unwrap();
        assert_eq!(get_json_lenient(&store, "queue"), None);
        store.set("queue", "[1,2]").unwrap();
        assert_eq!(
            get_json_lenient(&store, "queue"),
            Some(serde_json::json!([1, 2]))
        );
    }
}
