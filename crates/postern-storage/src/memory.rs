//! In-memory storage backend.

use crate::{SecureStore, StoreResult};
use std::collections::HashMap;
use std::sync::Mutex;

/// Non-persistent backend holding everything in a process-local map.
///
/// Used by tests throughout the workspace and available to hosts that must
/// run without an OS secure store (CI, containers).
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecureStore for MemoryStore {
    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.remove(key).is_some())
    }

    fn list_keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let mut keys: Vec<String> = entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_overwrite_delete() {
        let store = MemoryStore::new();

        store.set("key", "first").unwrap();
        assert_eq!(store.get("key").unwrap(), Some("first".to_string()));

        store.set("key", "second").unwrap();
        assert_eq!(store.get("key").unwrap(), Some("second".to_string()));

        assert!(store.delete("key").unwrap());
        assert!(!store.delete("key").unwrap());
        assert_eq!(store.get("key").unwrap(), None);
    }

    #[test]
    fn prefix_listing_is_sorted() {
        let store = MemoryStore::new();
        store.set("sync_b", "1").unwrap();
        store.set("sync_a", "2").unwrap();
        store.set("other", "3").unwrap();

        assert_eq!(
            store.list_keys_with_prefix("sync_").unwrap(),
            vec!["sync_a".to_string(), "sync_b".to_string()]
        );
        assert!(store.list_keys_with_prefix("nope").unwrap().is_empty());
    }
}
