//! Application state: the single API client, secure store and session.
//!
//! Built once at startup and passed by reference to everything that needs
//! the backend or local storage.

use std::sync::Arc;

use crate::api::ApiClient;
use crate::config::{ClientConfig, StorageConfig};
use crate::history::SearchHistory;
use crate::session::Session;
use crate::storage::{SecureStore, StorageError};

pub struct AppState {
    /// HTTP client for backend API communication.
    pub api: Arc<ApiClient>,

    /// Token, active package/role and cached strings.
    pub store: Arc<SecureStore>,

    pub session: Session,
}

impl AppState {
    /// Open storage, build the client and register the session's token provider.
    pub async fn new(
        client_config: ClientConfig,
        storage_config: &StorageConfig,
    ) -> Result<Self, StorageError> {
        let store = Arc::new(SecureStore::open(storage_config)?);
        let api = Arc::new(ApiClient::new(client_config, Some(store.clone())));
        let session = Session::new(store.clone());
        session.attach(&api).await;

        Ok(Self {
            api,
            store,
            session,
        })
    }

    /// Search history under `key` (defaults to the shared history key).
    pub fn search_history(&self, key: Option<&str>) -> SearchHistory {
        match key {
            Some(key) => SearchHistory::with_key(self.store.clone(), key),
            None => SearchHistory::new(self.store.clone()),
        }
    }
}
