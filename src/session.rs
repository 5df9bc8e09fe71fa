//! Session state shared between the auth flow and the API client.
//!
//! The session owns nothing but the secure store: the bearer token and the
//! selected role/package live there, and `attach` hands the client a token
//! provider that reads the current token on every request.

use std::sync::Arc;

use crate::api::ApiClient;
use crate::storage::{SecureStore, StorageError};

pub struct Session {
    store: Arc<SecureStore>,
}

impl Session {
    pub fn new(store: Arc<SecureStore>) -> Self {
        Self { store }
    }

    /// Register this session as the client's token provider.
    pub async fn attach(&self, client: &ApiClient) {
        let store = self.store.clone();
        client
            .set_token_provider(move || {
                let store = store.clone();
                async move { store.get_token() }
            })
            .await;
    }

    /// Persist a freshly issued token plus optional role/package selection.
    pub fn sign_in(
        &self,
        token: &str,
        role: Option<&str>,
        package: Option<&str>,
    ) -> Result<(), StorageError> {
        self.store.set_token(token)?;
        if let Some(role) = role {
            self.store.set_active_role(role)?;
        }
        if let Some(package) = package {
            self.store.set_active_package(package)?;
        }
        log::info!("Session started");
        Ok(())
    }

    /// Drop the token and clear stored session data.
    ///
    /// On the keychain backend only the reserved keys are cleared.
    pub fn sign_out(&self) -> Result<(), StorageError> {
        self.store.remove_token()?;
        self.store.clear_all()?;
        log::info!("Session ended");
        Ok(())
    }

    /// A token is stored.
    pub fn is_signed_in(&self) -> bool {
        self.store.get_token().is_some()
    }

    /// Role the user last switched to.
    pub fn active_role(&self) -> Option<String> {
        self.store.get_active_role()
    }

    /// Service package the user last switched to.
    pub fn active_package(&self) -> Option<String> {
        self.store.get_active_package()
    }

    /// Persist `role` as the active role.
    pub fn switch_role(&self, role: &str) -> Result<(), StorageError> {
        self.store.set_active_role(role)
    }

    /// Persist `package` as the active package.
    pub fn switch_package(&self, package: &str) -> Result<(), StorageError> {
        self.store.set_active_package(package)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tempfile::TempDir;

    use crate::config::ClientConfig;
    use crate::storage::LocalStorage;

    fn session() -> (TempDir, Arc<SecureStore>, Session) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(SecureStore::new(LocalStorage::open(dir.path()).unwrap()));
        let session = Session::new(store.clone());
        (dir, store, session)
    }

    #[test]
    fn test_sign_in_persists_token_and_selection() {
        let (_dir, store, session) = session();
        assert!(!session.is_signed_in());

        session.sign_in("tok", Some("provider"), Some("gold")).unwrap();

        assert!(session.is_signed_in());
        assert_eq!(store.get_token().as_deref(), Some("tok"));
        assert_eq!(session.active_role().as_deref(), Some("provider"));
        assert_eq!(session.active_package().as_deref(), Some("gold"));
    }

    #[test]
    fn test_switch_role_and_package() {
        let (_dir, _store, session) = session();
        session.sign_in("tok", None, None).unwrap();
        assert_eq!(session.active_role(), None);

        session.switch_role("agency_admin").unwrap();
        session.switch_package("starter").unwrap();
        assert_eq!(session.active_role().as_deref(), Some("agency_admin"));
        assert_eq!(session.active_package().as_deref(), Some("starter"));
    }

    #[test]
    fn test_sign_out_clears_session() {
        let (_dir, _store, session) = session();
        session.sign_in("tok", Some("customer"), Some("free")).unwrap();

        session.sign_out().unwrap();

        assert!(!session.is_signed_in());
        assert_eq!(session.active_role(), None);
        assert_eq!(session.active_package(), None);
    }

    #[tokio::test]
    async fn test_attach_registers_provider() {
        let (_dir, _store, session) = session();
        let config = ClientConfig::new("http://localhost:3000", Duration::from_secs(1)).unwrap();
        let client = ApiClient::new(config, None);

        assert!(!client.has_token_provider().await);
        session.attach(&client).await;
        assert!(client.has_token_provider().await);
    }
}
