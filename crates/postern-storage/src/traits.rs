//! Storage trait definitions.

use crate::StoreResult;

/// Trait for secure storage backends
pub trait SecureStore: Send + Sync {
    /// Store a value securely
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Retrieve a value
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Delete a value, returning whether it existed
    fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Check if a key exists
    fn has(&self, key: &str) -> StoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// List all keys that start with a given prefix.
    /// Returns an empty vec if not supported or no keys found.
    fn list_keys_with_prefix(&self, _prefix: &str) -> StoreResult<Vec<String>> {
        Ok(Vec::new())
    }

    /// Retrieve a value as raw bytes.
    /// Default implementation converts from string (assumes UTF-8 storage).
    fn get_bytes(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.get(key)?.map(|s| s.into_bytes()))
    }
}
