//! Key-value store backing all local persistence.
//!
//! DESIGN
//! ======
//! Each key holds one JSON document. The `Directory` backend keeps one
//! `<key>.json` file per key and replaces it through a temp file + rename,
//! so a crash mid-write leaves the previous document intact. The `Memory`
//! backend serves tests and throwaway sessions.
//!
//! ERROR HANDLING
//! ==============
//! Reads are lenient: a missing or unparsable document yields the caller's
//! default and logs the parse error. Writes are strict: quota and I/O
//! failures come back as `StorageError` and leave the stored value as it was.
//!
//! The quota counts key plus value bytes across all keys, like a browser
//! origin's storage budget.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use crate::error::StorageError;

const FILE_EXTENSION: &str = "json";

#[derive(Clone)]
pub struct LocalStore {
    inner: Arc<Mutex<StoreInner>>,
    quota_bytes: usize,
}

struct StoreInner {
    backend: Backend,
    /// Bytes used per key (key length + value length).
    sizes: HashMap<String, usize>,
}

enum Backend {
    Directory(PathBuf),
    Memory(HashMap<String, String>),
}

impl LocalStore {
    /// Open (creating if needed) a directory-backed store.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the directory cannot be created or listed.
    pub fn open(dir: impl AsRef<Path>, quota_bytes: usize) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let mut sizes = HashMap::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(FILE_EXTENSION) {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let len = usize::try_from(fs::metadata(&path)?.len()).unwrap_or(usize::MAX);
            sizes.insert(key.to_owned(), key.len().saturating_add(len));
        }
        debug!(dir = %dir.display(), keys = sizes.len(), "local store opened");

        Ok(Self {
            inner: Arc::new(Mutex::new(StoreInner { backend: Backend::Directory(dir), sizes })),
            quota_bytes,
        })
    }

    #[must_use]
    pub fn in_memory(quota_bytes: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreInner { backend: Backend::Memory(HashMap::new()), sizes: HashMap::new() })),
            quota_bytes,
        }
    }

    #[must_use]
    pub fn quota_bytes(&self) -> usize {
        self.quota_bytes
    }

    #[must_use]
    pub fn used_bytes(&self) -> usize {
        self.lock().sizes.values().sum()
    }

    /// Raw stored text for `key`, if any.
    #[must_use]
    pub fn get_raw(&self, key: &str) -> Option<String> {
        self.lock().read(key)
    }

    /// Parsed value for `key`; `None` when missing or unparsable.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get_raw(key)?;
        parse_logged(key, &raw)
    }

    /// Parsed value for `key`, or `default` when missing or unparsable.
    #[must_use]
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Serialize and store `value` under `key`.
    ///
    /// # Errors
    ///
    /// Returns `Serialization`, `QuotaExceeded`, or `Io`.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value)?;
        self.set_raw(key, raw)
    }

    /// Store raw text under `key`.
    ///
    /// # Errors
    ///
    /// Returns `QuotaExceeded` or `Io`.
    pub fn set_raw(&self, key: &str, raw: String) -> Result<(), StorageError> {
        let mut inner = self.lock();
        inner.write(key, raw, self.quota_bytes)
    }

    /// Remove `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the backing file exists but cannot be deleted.
    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut inner = self.lock();
        inner.remove(key)
    }

    /// Read-modify-write `key` under one lock so no other caller in this
    /// process interleaves between the read and the write.
    ///
    /// The closure's result is returned; on closure error nothing is written.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or the write error.
    pub fn update<T, R, F>(&self, key: &str, default: T, f: F) -> Result<R, StorageError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T) -> Result<R, StorageError>,
    {
        let mut inner = self.lock();
        let mut value = inner
            .read(key)
            .and_then(|raw| parse_logged(key, &raw))
            .unwrap_or(default);
        let out = f(&mut value)?;
        let raw = serde_json::to_string(&value)?;
        inner.write(key, raw, self.quota_bytes)?;
        Ok(out)
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl StoreInner {
    fn read(&self, key: &str) -> Option<String> {
        match &self.backend {
            Backend::Memory(map) => map.get(key).cloned(),
            Backend::Directory(dir) => {
                let path = key_path(dir, key);
                match fs::read_to_string(&path) {
                    Ok(raw) => Some(raw),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                    Err(e) => {
                        error!(error = %e, key, "local store read failed");
                        None
                    }
                }
            }
        }
    }

    fn write(&mut self, key: &str, raw: String, quota_bytes: usize) -> Result<(), StorageError> {
        let entry_bytes = key.len().saturating_add(raw.len());
        let others: usize = self
            .sizes
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(_, v)| *v)
            .sum();
        let needed = others.saturating_add(entry_bytes);
        if needed > quota_bytes {
            warn!(key, needed, limit = quota_bytes, "local store quota exceeded");
            return Err(StorageError::QuotaExceeded { needed, limit: quota_bytes });
        }

        match &mut self.backend {
            Backend::Memory(map) => {
                map.insert(key.to_owned(), raw);
            }
            Backend::Directory(dir) => {
                let path = key_path(dir, key);
                let tmp = path.with_extension(format!("{FILE_EXTENSION}.tmp"));
                fs::write(&tmp, raw.as_bytes())?;
                fs::rename(&tmp, &path)?;
            }
        }
        self.sizes.insert(key.to_owned(), entry_bytes);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        match &mut self.backend {
            Backend::Memory(map) => {
                map.remove(key);
            }
            Backend::Directory(dir) => match fs::remove_file(key_path(dir, key)) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            },
        }
        self.sizes.remove(key);
        Ok(())
    }
}

fn key_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{key}.{FILE_EXTENSION}"))
}

fn parse_logged<T: DeserializeOwned>(key: &str, raw: &str) -> Option<T> {
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            error!(error = %e, key, "stored document is not valid JSON for its type; using default");
            None
        }
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
