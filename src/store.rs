//! Client-side key-value cache. Values are JSON documents addressed by key,
//! overwritten wholesale on every `set`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;
use tracing::warn;

pub const THEME_KEY: &str = "theme";
pub const AVAILABLE_MODELS_KEY: &str = "availableModels";
pub const LOADED_MODELS_KEY: &str = "loadedModels";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode value: {0}")]
    Json(#[from] serde_json::Error),
}

pub trait KeyValueStore {
    fn get_raw(&self, key: &str) -> Option<Value>;

    fn set_raw(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Decodes the stored value. A value of the wrong shape reads as absent.
    fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T>
    where
        Self: Sized,
    {
        let raw = self.get_raw(key)?;
        match serde_json::from_value(raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring cached {:?}: {}", key, e);
                None
            }
        }
    }

    fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError>
    where
        Self: Sized,
    {
        self.set_raw(key, serde_json::to_value(value)?)
    }
}

/// Process-local store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_raw(&self, key: &str) -> Option<Value> {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        values.get(key).cloned()
    }

    fn set_raw(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value);
        Ok(())
    }
}

/// Store persisted as one JSON object on disk. Concurrent writers race and
/// the last one wins.
#[derive(Debug)]
pub struct JsonFileStore {
    values: RwLock<HashMap<String, Value>>,
    path: PathBuf,
}

impl JsonFileStore {
    pub const FILE_NAME: &'static str = "console-cache.json";

    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let values = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Discarding unreadable cache {}: {}", path.display(), e);
                HashMap::new()
            })
        } else {
            HashMap::new()
        };

        Ok(Self {
            values: RwLock::new(values),
            path,
        })
    }

    pub fn in_dir(dir: &Path) -> Result<Self, StoreError> {
        Self::open(dir.join(Self::FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, values: &HashMap<String, Value>) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get_raw(&self, key: &str) -> Option<Value> {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        values.get(key).cloned()
    }

    fn set_raw(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value);
        self.save(&values)
    }
}
