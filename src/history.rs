//! Persisted search history for list screens.
//!
//! Stored as a JSON array of strings under a single storage key, newest
//! first. Missing or unreadable history reads as empty.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::storage::{SecureStore, StorageError};

/// Default storage key for search history.
pub const HISTORY_KEY: &str = "search_history";

/// Default number of queries kept.
pub const DEFAULT_LIMIT: usize = 10;

pub struct SearchHistory {
    store: Arc<SecureStore>,
    key: String,
    limit: usize,
}

impl SearchHistory {
    pub fn new(store: Arc<SecureStore>) -> Self {
        Self::with_key(store, HISTORY_KEY)
    }

    /// History under a screen-specific key (e.g. `job_search_history`).
    pub fn with_key(store: Arc<SecureStore>, key: &str) -> Self {
        Self {
            store,
            key: key.to_string(),
            limit: DEFAULT_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Stored queries, newest first.
    pub fn entries(&self) -> Vec<String> {
        self.load().into_iter().collect()
    }

    /// Record a query: trimmed, de-duplicated case-insensitively, moved to
    /// the front and capped at the limit. Blank input is ignored.
    pub fn record(&self, query: &str) -> Result<Vec<String>, StorageError> {
        let query = query.trim();
        let mut entries = self.load();
        if query.is_empty() {
            return Ok(entries.into_iter().collect());
        }

        entries.retain(|existing| !existing.eq_ignore_ascii_case(query));
        entries.push_front(query.to_string());
        entries.truncate(self.limit);
        self.save(&entries)?;
        Ok(entries.into_iter().collect())
    }

    pub fn remove(&self, query: &str) -> Result<(), StorageError> {
        let query = query.trim();
        let mut entries = self.load();
        let before = entries.len();
        entries.retain(|existing| !existing.eq_ignore_ascii_case(query));
        if entries.len() == before {
            return Ok(());
        }
        self.save(&entries)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.store.remove_item(&self.key)
    }

    fn load(&self) -> VecDeque<String> {
        let Some(raw) = self.store.get_item(&self.key) else {
            return VecDeque::new();
        };
        match serde_json::from_str::<VecDeque<String>>(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Ignoring unreadable search history '{}': {}", self.key, e);
                VecDeque::new()
            }
        }
    }

    fn save(&self, entries: &VecDeque<String>) -> Result<(), StorageError> {
        let json = serde_json::to_string(entries)?;
        self.store.set_item(&self.key, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    use crate::storage::LocalStorage;

    fn history() -> (TempDir, Arc<SecureStore>, SearchHistory) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(SecureStore::new(LocalStorage::open(dir.path()).unwrap()));
        let history = SearchHistory::new(store.clone());
        (dir, store, history)
    }

    #[test]
    fn test_empty_by_default() {
        let (_dir, _store, history) = history();
        assert!(history.entries().is_empty());
    }

    #[test]
    fn test_newest_first_and_deduplicated() {
        let (_dir, store, history) = history();
        history.record("plumber").unwrap();
        history.record("  electrician ").unwrap();
        let entries = history.record("Plumber").unwrap();

        assert_eq!(entries, vec!["Plumber", "electrician"]);
        assert_eq!(
            store.get_item(HISTORY_KEY).as_deref(),
            Some(r#"["Plumber","electrician"]"#)
        );
    }

    #[test]
    fn test_blank_query_ignored() {
        let (_dir, _store, history) = history();
        history.record("tutor").unwrap();
        assert_eq!(history.record("   ").unwrap(), vec!["tutor"]);
    }

    #[test]
    fn test_capped_at_limit() {
        let (_dir, _store, history) = history();
        let history = history.with_limit(3);
        for q in ["a", "b", "c", "d", "e"] {
            history.record(q).unwrap();
        }
        assert_eq!(history.entries(), vec!["e", "d", "c"]);
    }

    #[test]
    fn test_remove_and_clear() {
        let (_dir, _store, history) = history();
        history.record("cleaner").unwrap();
        history.record("driver").unwrap();

        history.remove("CLEANER").unwrap();
        assert_eq!(history.entries(), vec!["driver"]);

        history.remove("not there").unwrap();
        history.clear().unwrap();
        assert!(history.entries().is_empty());
    }

    #[test]
    fn test_corrupt_history_reads_as_empty() {
        let (_dir, store, history) = history();
        store.set_item(HISTORY_KEY, "{oops").unwrap();
        assert!(history.entries().is_empty());
        assert_eq!(history.record("mason").unwrap(), vec!["mason"]);
    }

    #[test]
    fn test_screen_specific_keys_are_separate() {
        let (_dir, store, jobs) = history();
        let agencies = SearchHistory::with_key(store, "agency_search_history");
        jobs.record("welder").unwrap();
        agencies.record("staffing").unwrap();

        assert_eq!(jobs.entries(), vec!["welder"]);
        assert_eq!(agencies.entries(), vec!["staffing"]);
        assert_eq!(agencies.key(), "agency_search_history");
    }
}
