//! Secure key-value storage for tokens, preferences and cached strings.
//!
//! Two backends sit behind `StorageBackend`: the platform keychain (via the
//! `keyring` crate) and a local storage namespace persisted as a JSON file.
//! The backend is chosen once at startup; `SecureStore` applies the uniform
//! error policy on top of it.

pub mod keychain;
pub mod local;
#[cfg(test)]
mod tests;

pub use keychain::KeychainStorage;
pub use local::LocalStorage;

use std::fmt;

use thiserror::Error;

use crate::config::{StorageChoice, StorageConfig};

/// Reserved key holding the bearer token.
pub const TOKEN_KEY: &str = "auth_token";

/// Reserved key holding the selected service package.
pub const ACTIVE_PACKAGE_KEY: &str = "active_package";

/// Reserved key holding the selected account role.
pub const ACTIVE_ROLE_KEY: &str = "active_role";

/// Keys that `clear_all` purges on the keychain backend. Keys outside this
/// list (e.g. search history) survive a keychain clear.
pub const RESERVED_KEYS: [&str; 3] = [TOKEN_KEY, ACTIVE_PACKAGE_KEY, ACTIVE_ROLE_KEY];

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage key must not be empty")]
    EmptyKey,
    #[error("Keychain operation failed: {0}")]
    Keychain(String),
    #[error("Local storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Local storage is corrupt: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl From<keyring::Error> for StorageError {
    fn from(err: keyring::Error) -> Self {
        StorageError::Keychain(err.to_string())
    }
}

/// Which mechanism backs the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Local,
    Keychain,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Local => f.write_str("local"),
            StorageKind::Keychain => f.write_str("keychain"),
        }
    }
}

/// Raw backend operations. Errors are reported as-is; policy lives in `SecureStore`.
pub trait StorageBackend: Send + Sync {
    fn kind(&self) -> StorageKind;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// `Ok(None)` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Removing an absent key succeeds.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    fn clear(&self) -> Result<(), StorageError>;
}

/// Uniform string API over the selected backend.
///
/// Writes, removals and clears propagate errors. Reads never fail: an
/// unreadable value is logged and reported as absent.
pub struct SecureStore {
    backend: Box<dyn StorageBackend>,
}

impl SecureStore {
    /// Wrap an already opened backend.
    pub fn new<B: StorageBackend + 'static>(backend: B) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    /// Open the backend named by config, detecting platform capability for `Auto`.
    pub fn open(config: &StorageConfig) -> Result<Self, StorageError> {
        let store = match config.choice {
            StorageChoice::Local => Self::new(LocalStorage::open(&config.data_dir)?),
            StorageChoice::Keychain => {
                if !has_native_keychain() || !KeychainStorage::probe(keychain::SERVICE_NAME) {
                    return Err(StorageError::Unavailable(
                        "no native keychain on this platform".into(),
                    ));
                }
                Self::new(KeychainStorage::default())
            }
            StorageChoice::Auto => {
                if has_native_keychain() && KeychainStorage::probe(keychain::SERVICE_NAME) {
                    Self::new(KeychainStorage::default())
                } else {
                    Self::new(LocalStorage::open(&config.data_dir)?)
                }
            }
        };
        log::info!("Using {} storage backend", store.kind());
        Ok(store)
    }

    /// Backend selected at startup.
    pub fn kind(&self) -> StorageKind {
        self.backend.kind()
    }

    /// Store a string value under `key`.
    pub fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        check_key(key)?;
        self.backend.set(key, value)
    }

    /// Read the value under `key`; absent and unreadable both give `None`.
    pub fn get_item(&self, key: &str) -> Option<String> {
        if key.is_empty() {
            return None;
        }
        match self.backend.get(key) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Failed to read '{}' from {} storage: {}", key, self.kind(), e);
                None
            }
        }
    }

    /// Delete `key`. Removing an absent key succeeds.
    pub fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        check_key(key)?;
        self.backend.remove(key)
    }

    /// Local storage: wipe the whole namespace. Keychain: delete `RESERVED_KEYS` only.
    pub fn clear_all(&self) -> Result<(), StorageError> {
        self.backend.clear()
    }

    /// Store the bearer token.
    pub fn set_token(&self, token: &str) -> Result<(), StorageError> {
        self.set_item(TOKEN_KEY, token)
    }

    /// Read the bearer token.
    pub fn get_token(&self) -> Option<String> {
        self.get_item(TOKEN_KEY)
    }

    /// Delete the bearer token (used on logout).
    pub fn remove_token(&self) -> Result<(), StorageError> {
        self.remove_item(TOKEN_KEY)
    }

    /// Store the selected service package.
    pub fn set_active_package(&self, package: &str) -> Result<(), StorageError> {
        self.set_item(ACTIVE_PACKAGE_KEY, package)
    }

    /// Read the selected service package.
    pub fn get_active_package(&self) -> Option<String> {
        self.get_item(ACTIVE_PACKAGE_KEY)
    }

    /// Store the selected account role.
    pub fn set_active_role(&self, role: &str) -> Result<(), StorageError> {
        self.set_item(ACTIVE_ROLE_KEY, role)
    }

    /// Read the selected account role.
    pub fn get_active_role(&self) -> Option<String> {
        self.get_item(ACTIVE_ROLE_KEY)
    }
}

fn check_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() {
        return Err(StorageError::EmptyKey);
    }
    Ok(())
}

/// Platforms where `keyring` is built with a native secure store.
fn has_native_keychain() -> bool {
    cfg!(any(target_os = "macos", target_os = "ios"))
}
