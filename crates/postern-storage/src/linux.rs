//! Linux Secret Service implementation.

use crate::{SecureStore, StoreError, StoreResult};
use secret_service::{blocking::SecretService, EncryptionType};
use std::collections::HashMap;
use tracing::debug;

/// Secret Service backed secure storage for Linux.
pub struct SecretServiceStore {
    service_name: String,
}

impl SecretServiceStore {
    pub fn new(service_name: &str) -> StoreResult<Self> {
        // Verify we can reach the Secret Service bus before handing out a store
        SecretService::connect(EncryptionType::Dh).map_err(|e| {
            StoreError::Platform(format!("Failed to connect to Secret Service: {}", e))
        })?;

        Ok(Self {
            service_name: service_name.to_string(),
        })
    }

    fn with_collection<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&secret_service::blocking::Collection) -> StoreResult<T>,
    {
        let service = SecretService::connect(EncryptionType::Dh)
            .map_err(|e| StoreError::Platform(e.to_string()))?;

        let collection = service
            .get_default_collection()
            .map_err(|e| StoreError::Platform(e.to_string()))?;

        if collection.is_locked().unwrap_or(false) {
            collection
                .unlock()
                .map_err(|e| StoreError::Platform(format!("Failed to unlock collection: {}", e)))?;
        }

        f(&collection)
    }

    fn attributes<'a>(&'a self, key: &'a str) -> HashMap<&'a str, &'a str> {
        HashMap::from([("service", self.service_name.as_str()), ("key", key)])
    }
}

impl SecureStore for SecretServiceStore {
    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        debug!(service = %self.service_name, key = %key, "Setting secret");

        let _ = self.delete(key);

        self.with_collection(|collection| {
            let label = format!("{}/{}", self.service_name, key);
            collection
                .create_item(
                    &label,
                    self.attributes(key),
                    value.as_bytes(),
                    true, // replace
                    "text/plain",
                )
                .map_err(|e| StoreError::Platform(e.to_string()))?;
            Ok(())
        })
    }

    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        debug!(service = %self.service_name, key = %key, "Getting secret");

        self.with_collection(|collection| {
            let items = collection
                .search_items(self.attributes(key))
                .map_err(|e| StoreError::Platform(e.to_string()))?;

            let Some(item) = items.first() else {
                return Ok(None);
            };

            let secret = item
                .get_secret()
                .map_err(|e| StoreError::Platform(e.to_string()))?;

            let value =
                String::from_utf8(secret).map_err(|e| StoreError::Encoding(e.to_string()))?;
            Ok(Some(value))
        })
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        debug!(service = %self.service_name, key = %key, "Deleting secret");

        self.with_collection(|collection| {
            let items = collection
                .search_items(self.attributes(key))
                .map_err(|e| StoreError::Platform(e.to_string()))?;

            let Some(item) = items.first() else {
                return Ok(false);
            };

            item.delete()
                .map_err(|e| StoreError::Platform(e.to_string()))?;
            Ok(true)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SERVICE: &str = "com.postern.device.test";

    #[test]
    #[ignore] // Requires Linux Secret Service (D-Bus)
    fn secret_service_operations() {
        let store = SecretServiceStore::new(TEST_SERVICE).unwrap();

        let _ = store.delete("test_key");

        store.set("test_key", "test_value").unwrap();
        assert_eq!(store.get("test_key").unwrap(), Some("test_value".to_string()));

        store.set("test_key", "new_value").unwrap();
        assert_eq!(store.get("test_key").unwrap(), Some("new_value".to_string()));

        assert!(store.has("test_key").unwrap());
        assert!(!store.has("nonexistent").unwrap());

        assert!(store.delete("test_key").unwrap());
        assert!(!store.delete("test_key").unwrap());
        assert_eq!(store.get("test_key").unwrap(), None);
    }
}
