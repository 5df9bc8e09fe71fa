//! Local storage namespace persisted as a single JSON document.
//!
//! The file is dedicated to this app, so clearing it wipes every key.
//! Writes go to a sibling temp file and are renamed into place.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::{StorageBackend, StorageError, StorageKind};

/// File name of the namespace inside the data directory.
pub const NAMESPACE_FILE: &str = "local_storage.json";

pub struct LocalStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl LocalStorage {
    /// Open (or create) the namespace under `dir`.
    ///
    /// A corrupt namespace file is logged and replaced on the next write.
    pub fn open(dir: &Path) -> Result<Self, StorageError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(NAMESPACE_FILE);

        let entries = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(map) => map,
                Err(e) => {
                    log::warn!("Discarding corrupt local storage at {}: {}", path.display(), e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(StorageError::Io(e)),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, String>>, StorageError> {
        self.entries
            .lock()
            .map_err(|_| StorageError::Unavailable("local storage lock poisoned".into()))
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl StorageBackend for LocalStorage {
    fn kind(&self) -> StorageKind {
        StorageKind::Local
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.lock()?;
        let previous = entries.insert(key.to_string(), value.to_string());
        if let Err(e) = self.persist(&entries) {
            // Keep memory in step with disk.
            match previous {
                Some(old) => entries.insert(key.to_string(), old),
                None => entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.lock()?;
        let Some(old) = entries.remove(key) else {
            return Ok(());
        };
        if let Err(e) = self.persist(&entries) {
            entries.insert(key.to_string(), old);
            return Err(e);
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut entries = self.lock()?;
        let empty = BTreeMap::new();
        self.persist(&empty)?;
        entries.clear();
        Ok(())
    }
}
