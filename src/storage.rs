//! Key-value persistence for the sensor registry.
//!
//! Repositories and the theme setting never touch a concrete backend; they
//! receive an `Arc<dyn KeyValueStore>`. Two backends are provided:
//! - [`MemoryStore`]: a map in memory, used by tests and as a fallback
//! - [`FileStore`]: a single JSON object on disk, the local-storage analogue
//!   used by the binary
//!
//! Both enforce an optional byte quota over the sum of key and value lengths,
//! so a full store fails the same way a browser's local storage does.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{StorageError, StorageResult};

// ---

/// Persisted sensor collection.
pub const SENSORS_KEY: &str = "sensor-app:sensors";

/// Persisted reading collection.
pub const READINGS_KEY: &str = "sensor-app:readings";

/// Persisted colour scheme.
pub const THEME_KEY: &str = "theme-mode";

/// Default quota, matching the usual browser local-storage allowance.
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

/// String-keyed, string-valued store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    fn remove(&self, key: &str) -> StorageResult<()>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Bytes the store would hold after replacing `key` with `value`.
fn usage_after<'a, I>(entries: I, key: &str, value: &str) -> usize
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let others: usize = entries
        .into_iter()
        .filter(|(k, _)| k.as_str() != key)
        .map(|(k, v)| k.len() + v.len())
        .sum();
    others + key.len() + value.len()
}

fn check_quota(key: &str, needed: usize, limit: Option<usize>) -> StorageResult<()> {
    match limit {
        Some(limit) if needed > limit => Err(StorageError::QuotaExceeded {
            key: key.to_string(),
            needed,
            limit,
        }),
        _ => Ok(()),
    }
}

// ---

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects writes once it would exceed `limit` bytes.
    pub fn with_quota(limit: usize) -> Self {
        Self {
            entries: Mutex::default(),
            quota: Some(limit),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        // ---
        let mut entries = lock(&self.entries);
        check_quota(key, usage_after(entries.iter(), key, value), self.quota)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        lock(&self.entries).remove(key);
        Ok(())
    }
}

// ---

/// Store backed by one JSON object file (`{"key": "value", ...}`).
///
/// The whole file is loaded on open and rewritten on every mutation
/// through a temporary file and a rename, so a crash mid-write leaves the
/// previous contents intact.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    quota: usize,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`.
    ///
    /// A missing or empty file is an empty store. A file that is not a JSON
    /// object of strings is reported as [`StorageError::Corrupt`].
    pub fn open(path: impl Into<PathBuf>, quota: usize) -> StorageResult<Self> {
        // ---
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw).map_err(|source| StorageError::Corrupt {
                key: path.display().to_string(),
                source,
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StorageError::Io { path, source }),
        };

        tracing::debug!(path = %path.display(), keys = entries.len(), "Opened file store");

        Ok(Self {
            path,
            quota,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> StorageResult<()> {
        // ---
        let io_err = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };

        let json = serde_json::to_string_pretty(entries).map_err(|source| StorageError::Encode {
            key: self.path.display().to_string(),
            source,
        })?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        // ---
        let mut entries = lock(&self.entries);
        check_quota(key, usage_after(entries.iter(), key, value), Some(self.quota))?;

        let previous = entries.insert(key.to_string(), value.to_string());
        if let Err(e) = self.flush(&entries) {
            // Keep memory consistent with what is on disk.
            match previous {
                Some(old) => entries.insert(key.to_string(), old),
                None => entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        // ---
        let mut entries = lock(&self.entries);
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }
}
