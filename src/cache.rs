//! Local key/value cache for last-known detection lists.

use crate::detection::Detection;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache entry could not be encoded: {0}")]
    Json(#[from] serde_json::Error),
}

/// Storage-agnostic cache. Values are stored as JSON.
pub trait Cache {
    /// Missing or unreadable entries read as `None`.
    fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T>;

    fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), CacheError>;
}

impl<C: Cache + ?Sized> Cache for &C {
    fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        (**self).get(key)
    }

    fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        (**self).remove(key)
    }
}

impl<C: Cache + ?Sized> Cache for std::sync::Arc<C> {
    fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        (**self).get(key)
    }

    fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        (**self).remove(key)
    }
}

pub fn detection_cache_key(transformer_id: &str, inspection_id: &str) -> String {
    format!("anomaly_results_{transformer_id}_{inspection_id}")
}

/// What is remembered about an inspection's detections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedDetections {
    pub detections: Vec<Detection>,
    pub analysis_date: String,
    pub transformer_id: String,
    pub inspection_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edits_confirmed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub re_analyzed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation_type_breakdown: Option<BTreeMap<String, usize>>,
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache under the platform cache directory.
    pub fn in_default_location() -> Option<Self> {
        directories::ProjectDirs::from("", "", "thermal-inspector")
            .map(|dirs| Self::new(dirs.cache_dir().join("detections")))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

impl Cache for FileCache {
    fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.path_for(key);
        let content = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("ignoring unreadable cache entry {}: {e}", path.display());
                None
            }
        }
    }

    fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(value)?;
        std::fs::write(self.path_for(key), json)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local cache, mainly for tests.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, serde_json::Value>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .lock()
            .map(|entries| entries.contains_key(key))
            .unwrap_or(false)
    }
}

impl Cache for MemoryCache {
    fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entries = self.entries.lock().ok()?;
        let value = entries.get(key)?.clone();
        serde_json::from_value(value).ok()
    }

    fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        let value = serde_json::to_value(value)?;
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
        Ok(())
    }
}
