//! Client core for the super app: the backend API client and the secure
//! key-value store, plus the session and search-history helpers built on them.

pub mod api;
pub mod config;
pub mod history;
pub mod session;
pub mod state;
pub mod storage;

pub use api::{ApiClient, ApiError, Body, RequestOptions};
pub use config::{ClientConfig, StorageChoice, StorageConfig};
pub use state::AppState;
pub use storage::{SecureStore, StorageBackend, StorageError, StorageKind};
