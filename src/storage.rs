use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::StorageConfig;
use crate::error::{Result, SubweaveError};

/// Named bag of JSON values that outlives a session
///
/// All keys live in one JSON object, so `clean` drops everything at once.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<Value>>;

    fn set(&mut self, key: &str, value: Value) -> Result<()>;

    fn del(&mut self, key: &str) -> Result<()>;

    fn clean(&mut self) -> Result<()>;
}

/// Store backed by `<dir>/<name>.json`
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(dir: P, name: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("{}.json", name)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole object; a missing or unreadable file counts as empty
    fn load(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let content = std::fs::read_to_string(&self.path)?;
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) | Err(_) => {
                warn!("Ignoring unreadable store file: {}", self.path.display());
                Ok(Map::new())
            }
        }
    }

    fn save(&self, map: Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SubweaveError::Storage(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let content = serde_json::to_string(&Value::Object(map))?;
        std::fs::write(&self.path, content)
            .map_err(|e| SubweaveError::Storage(format!("Failed to write {}: {}", self.path.display(), e)))?;
        debug!("Saved store file: {}", self.path.display());
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.load()?.remove(key))
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        let mut map = self.load()?;
        map.insert(key.to_string(), value);
        self.save(map)
    }

    fn del(&mut self, key: &str) -> Result<()> {
        let mut map = self.load()?;
        if map.remove(key).is_some() {
            self.save(map)?;
        }
        Ok(())
    }

    fn clean(&mut self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

/// In-process store for sessions that should not touch the disk
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Map<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn del(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }

    fn clean(&mut self) -> Result<()> {
        self.values.clear();
        Ok(())
    }
}

/// Factory for creating store instances
pub struct StoreFactory;

impl StoreFactory {
    /// File-backed store at the configured location
    pub fn create_file_store(config: &StorageConfig) -> Box<dyn KeyValueStore> {
        Box::new(JsonFileStore::new(&config.dir, &config.name))
    }

    pub fn create_memory_store() -> Box<dyn KeyValueStore> {
        Box::new(MemoryStore::new())
    }
}
