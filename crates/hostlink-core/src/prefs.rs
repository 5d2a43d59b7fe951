//! Key-value preference storage with an explicit read-through cache.
//!
//! [`CachedPreference::get`] never writes and [`CachedPreference::commit`]
//! is the only way a value reaches the store. [`DataChangedFlag`] lets the
//! host tell the engine that persisted data changed since it last looked.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{HostError, Result};

/// Backing store for preferences.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>>;

    fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Returns whether the key was present.
    fn remove(&self, key: &str) -> Result<bool>;
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        self.values.write().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.values.write().remove(key).is_some())
    }
}

/// Store persisted as a single JSON object file.
///
/// Every write replaces the file atomically (temp file in the same
/// directory, then rename).
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, Value>>,
}

impl JsonFileStore {
    /// Open `path`, starting empty if the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = if path.exists() {
            let content =
                fs::read_to_string(&path).map_err(|e| HostError::io_with_path(e, &path))?;
            serde_json::from_str(&content).map_err(|e| HostError::Json {
                message: format!("Failed to parse {}: {}", path.display(), e),
                source: Some(e),
            })?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, values: &BTreeMap<String, Value>) -> Result<()> {
        write_json_atomic(&self.path, values)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut values = self.values.lock();
        let previous = values.insert(key.to_string(), value);
        if let Err(e) = self.flush(&values) {
            // Keep memory consistent with disk.
            match previous {
                Some(previous) => values.insert(key.to_string(), previous),
                None => values.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let mut values = self.values.lock();
        let Some(previous) = values.remove(key) else {
            return Ok(false);
        };
        if let Err(e) = self.flush(&values) {
            values.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(true)
    }
}

fn write_json_atomic<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if !parent.exists() {
        fs::create_dir_all(&parent).map_err(|e| HostError::io_with_path(e, &parent))?;
    }

    let serialized = serde_json::to_string_pretty(data)?;
    let mut temp = NamedTempFile::new_in(&parent).map_err(|e| HostError::io_with_path(e, &parent))?;
    temp.write_all(serialized.as_bytes())
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|e| HostError::io_with_path(e, temp.path()))?;
    temp.persist(path)
        .map_err(|e| HostError::io_with_path(e.error, path))?;

    debug!("Atomically wrote {}", path.display());
    Ok(())
}

/// A single typed preference with a read-through cache.
pub struct CachedPreference<T> {
    store: Arc<dyn KeyValueStore>,
    key: String,
    default: T,
    cached: Mutex<Option<T>>,
}

impl<T> CachedPreference<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    /// Preference `key` in `store`, falling back to `default`.
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>, default: T) -> Self {
        Self {
            store,
            key: key.into(),
            default,
            cached: Mutex::new(None),
        }
    }

    /// Store key of this preference.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current value. The store is read only on the first call after
    /// construction or [`invalidate`](Self::invalidate); the default is
    /// returned when the key is missing, unreadable or undecodable.
    pub fn get(&self) -> T {
        let mut cached = self.cached.lock();
        if let Some(value) = cached.as_ref() {
            return value.clone();
        }

        let value = match self.store.get(&self.key) {
            Ok(Some(raw)) => match serde_json::from_value(raw) {
                Ok(value) => value,
                Err(e) => {
                    warn!("Preference {} could not be decoded: {}", self.key, e);
                    self.default.clone()
                }
            },
            Ok(None) => self.default.clone(),
            Err(e) => {
                warn!("Preference {} could not be read: {}", self.key, e);
                self.default.clone()
            }
        };
        *cached = Some(value.clone());
        value
    }

    /// Write `value` through to the store and cache it.
    pub fn commit(&self, value: T) -> Result<()> {
        let raw = serde_json::to_value(&value)?;
        let mut cached = self.cached.lock();
        self.store.set(&self.key, raw)?;
        *cached = Some(value);
        Ok(())
    }

    /// Drop the cached value so the next `get` reads the store again.
    pub fn invalidate(&self) {
        *self.cached.lock() = None;
    }
}

/// Read-and-clear flag signalling that persisted data changed.
#[derive(Debug, Default)]
pub struct DataChangedFlag {
    changed: AtomicBool,
}

impl DataChangedFlag {
    /// Create a flag that is not set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag that persisted data changed.
    pub fn mark_changed(&self) {
        self.changed.store(true, Ordering::SeqCst);
    }

    /// Whether the flag is set, without clearing it.
    pub fn is_changed(&self) -> bool {
        self.changed.load(Ordering::SeqCst)
    }

    /// Return whether data changed since the last call, clearing the flag.
    pub fn take_changed(&self) -> bool {
        self.changed.swap(false, Ordering::SeqCst)
    }
}
