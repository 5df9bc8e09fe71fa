//! Tests for the storage backends and the `SecureStore` error policy.
//!
//! Keychain tests run against keyring's mock credential store.

#[cfg(test)]
mod secure_store_tests {
    use tempfile::TempDir;

    use crate::config::{StorageChoice, StorageConfig};
    use crate::storage::{
        KeychainStorage, LocalStorage, SecureStore, StorageBackend, StorageError, StorageKind,
        ACTIVE_PACKAGE_KEY, ACTIVE_ROLE_KEY, TOKEN_KEY,
    };

    // ── Helpers ──────────────────────────────────────────────────────────

    fn local_store() -> (TempDir, SecureStore) {
        let dir = TempDir::new().unwrap();
        let store = SecureStore::new(LocalStorage::open(dir.path()).unwrap());
        (dir, store)
    }

    fn keychain_store(service: &str) -> SecureStore {
        keyring::set_default_credential_builder(keyring::mock::default_credential_builder());
        SecureStore::new(KeychainStorage::new(service))
    }

    /// Backend whose every operation fails.
    struct BrokenBackend;

    impl StorageBackend for BrokenBackend {
        fn kind(&self) -> StorageKind {
            StorageKind::Local
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disk full".into()))
        }

        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("unreadable".into()))
        }

        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("read-only".into()))
        }

        fn clear(&self) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("read-only".into()))
        }
    }

    // ── Local storage ────────────────────────────────────────────────────

    #[test]
    fn test_local_set_get_remove() {
        let (_dir, store) = local_store();
        assert_eq!(store.kind(), StorageKind::Local);

        store.set_item("k", "v").unwrap();
        assert_eq!(store.get_item("k").as_deref(), Some("v"));

        store.remove_item("k").unwrap();
        assert_eq!(store.get_item("k"), None);
    }

    #[test]
    fn test_local_remove_absent_key_is_ok() {
        let (_dir, store) = local_store();
        store.remove_item("never-set").unwrap();
    }

    #[test]
    fn test_local_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = SecureStore::new(LocalStorage::open(dir.path()).unwrap());
            store.set_token("tok-123").unwrap();
            store.set_item("search_history", r#"["plumber"]"#).unwrap();
        }
        let store = SecureStore::new(LocalStorage::open(dir.path()).unwrap());
        assert_eq!(store.get_token().as_deref(), Some("tok-123"));
        assert_eq!(store.get_item("search_history").as_deref(), Some(r#"["plumber"]"#));
    }

    #[test]
    fn test_local_clear_all_wipes_namespace() {
        let (dir, store) = local_store();
        store.set_token("tok").unwrap();
        store.set_active_role("provider").unwrap();
        store.set_item("search_history", "[]").unwrap();

        store.clear_all().unwrap();

        assert_eq!(store.get_token(), None);
        assert_eq!(store.get_active_role(), None);
        assert_eq!(store.get_item("search_history"), None);

        // Cleared on disk too.
        let reopened = SecureStore::new(LocalStorage::open(dir.path()).unwrap());
        assert_eq!(reopened.get_item("search_history"), None);
    }

    #[test]
    fn test_local_corrupt_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(crate::storage::local::NAMESPACE_FILE), "{not json").unwrap();

        let store = SecureStore::new(LocalStorage::open(dir.path()).unwrap());
        assert_eq!(store.get_token(), None);
        store.set_token("fresh").unwrap();
        assert_eq!(store.get_token().as_deref(), Some("fresh"));
    }

    #[test]
    fn test_empty_key_rejected_on_write() {
        let (_dir, store) = local_store();
        assert!(matches!(store.set_item("", "v"), Err(StorageError::EmptyKey)));
        assert!(matches!(store.remove_item(""), Err(StorageError::EmptyKey)));
        assert_eq!(store.get_item(""), None);
    }

    #[test]
    fn test_open_with_forced_local_choice() {
        let dir = TempDir::new().unwrap();
        let config = StorageConfig {
            choice: StorageChoice::Local,
            data_dir: dir.path().join("nested"),
        };
        let store = SecureStore::open(&config).unwrap();
        assert_eq!(store.kind(), StorageKind::Local);
        store.set_item("k", "v").unwrap();
        assert!(dir.path().join("nested").join(crate::storage::local::NAMESPACE_FILE).exists());
    }

    /// Without a native keychain, keyring only has its in-process store,
    /// so forcing the keychain must fail instead of losing every write.
    #[cfg(not(any(target_os = "macos", target_os = "ios")))]
    #[test]
    fn test_forced_keychain_unavailable_without_native_store() {
        let dir = TempDir::new().unwrap();
        let config = StorageConfig {
            choice: StorageChoice::Keychain,
            data_dir: dir.path().to_path_buf(),
        };
        assert!(matches!(
            SecureStore::open(&config),
            Err(StorageError::Unavailable(_))
        ));
    }

    // ── Keychain ─────────────────────────────────────────────────────────

    #[test]
    fn test_keychain_set_get_remove() {
        let store = keychain_store("test.keychain.roundtrip");
        assert_eq!(store.kind(), StorageKind::Keychain);

        store.set_item("k", "v").unwrap();
        assert_eq!(store.get_item("k").as_deref(), Some("v"));

        store.remove_item("k").unwrap();
        assert_eq!(store.get_item("k"), None);

        // Idempotent
        store.remove_item("k").unwrap();
    }

    #[test]
    fn test_keychain_token_wrappers() {
        let store = keychain_store("test.keychain.token");
        assert_eq!(store.get_token(), None);
        store.set_token("abc").unwrap();
        assert_eq!(store.get_item(TOKEN_KEY).as_deref(), Some("abc"));
        store.remove_token().unwrap();
        assert_eq!(store.get_token(), None);
    }

    /// The keychain clear is an allow-list: only the reserved keys go.
    /// A custom key such as the search history must survive. If a new
    /// persisted key is added it has to be added to `RESERVED_KEYS` explicitly.
    #[test]
    fn test_keychain_clear_all_leaves_custom_keys() {
        let store = keychain_store("test.keychain.clear");
        store.set_token("tok").unwrap();
        store.set_active_package("premium").unwrap();
        store.set_active_role("agency").unwrap();
        store.set_item("search_history", r#"["electrician"]"#).unwrap();

        store.clear_all().unwrap();

        assert_eq!(store.get_item(TOKEN_KEY), None);
        assert_eq!(store.get_item(ACTIVE_PACKAGE_KEY), None);
        assert_eq!(store.get_item(ACTIVE_ROLE_KEY), None);
        assert_eq!(
            store.get_item("search_history").as_deref(),
            Some(r#"["electrician"]"#)
        );
    }

    #[test]
    fn test_keychain_clear_all_with_nothing_stored() {
        let store = keychain_store("test.keychain.clear-empty");
        store.clear_all().unwrap();
    }

    // ── Error policy ─────────────────────────────────────────────────────

    #[test]
    fn test_read_failure_is_absence() {
        let store = SecureStore::new(BrokenBackend);
        assert_eq!(store.get_item("k"), None);
        assert_eq!(store.get_token(), None);
    }

    #[test]
    fn test_write_failures_propagate() {
        let store = SecureStore::new(BrokenBackend);
        assert!(store.set_item("k", "v").is_err());
        assert!(store.set_token("t").is_err());
        assert!(store.remove_item("k").is_err());
        assert!(store.clear_all().is_err());
    }
}
