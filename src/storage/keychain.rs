//! Platform keychain backend.
//!
//! Uses the `keyring` crate (apple-native feature for the macOS/iOS Keychain).
//! Values are encrypted at rest by the OS and never written to disk by us.

use std::collections::HashMap;
use std::sync::Mutex;

use keyring::Entry;

use super::{StorageBackend, StorageError, StorageKind, RESERVED_KEYS};

/// Keychain service name matching the app identifier.
pub const SERVICE_NAME: &str = "com.superapp.mobile";

/// Account name used to check that the keychain is reachable.
const PROBE_KEY: &str = "__superapp_probe__";

/// One keychain item per key under a fixed service name.
///
/// Entry handles are cached per key so repeated calls address the same item.
pub struct KeychainStorage {
    service: String,
    entries: Mutex<HashMap<String, Entry>>,
}

impl KeychainStorage {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Whether the platform keychain answers a read.
    ///
    /// `NoEntry` counts as reachable; any other error means it is not.
    pub fn probe(service: &str) -> bool {
        let result = Entry::new(service, PROBE_KEY).and_then(|entry| entry.get_password());
        match result {
            Ok(_) | Err(keyring::Error::NoEntry) => true,
            Err(e) => {
                log::info!("Keychain unavailable: {}", e);
                false
            }
        }
    }

    fn with_entry<T>(
        &self,
        key: &str,
        op: impl FnOnce(&Entry) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StorageError::Unavailable("keychain entry cache poisoned".into()))?;
        if !entries.contains_key(key) {
            let entry = Entry::new(&self.service, key)?;
            entries.insert(key.to_string(), entry);
        }
        match entries.get(key) {
            Some(entry) => op(entry),
            None => Err(StorageError::Unavailable(format!("no keychain entry for {}", key))),
        }
    }
}

impl Default for KeychainStorage {
    fn default() -> Self {
        Self::new(SERVICE_NAME)
    }
}

impl StorageBackend for KeychainStorage {
    fn kind(&self) -> StorageKind {
        StorageKind::Keychain
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.with_entry(key, |entry| Ok(entry.set_password(value)?))
    }

    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.with_entry(key, |entry| match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(StorageError::from(e)),
        })
    }

    /// Idempotent: ignores `NoEntry` (already deleted or never stored).
    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.with_entry(key, |entry| match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(StorageError::from(e)),
        })
    }

    /// The keychain has no bulk delete, so only the reserved keys are removed.
    fn clear(&self) -> Result<(), StorageError> {
        for key in RESERVED_KEYS {
            self.remove(key)?;
        }
        Ok(())
    }
}
