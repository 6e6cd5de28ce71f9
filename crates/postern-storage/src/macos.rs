//! macOS Keychain implementation.

use crate::{SecureStore, StoreError, StoreResult};
use security_framework::item::{ItemClass, ItemSearchOptions, Limit, SearchResult};
use security_framework::passwords::{delete_generic_password, set_generic_password};
use tracing::debug;

/// Keychain-backed secure storage for macOS.
pub struct KeychainStore {
    service_name: String,
}

impl KeychainStore {
    pub fn new(service_name: &str) -> StoreResult<Self> {
        Ok(Self {
            service_name: service_name.to_string(),
        })
    }

    /// The Security framework reports a missing item as an error; map the
    /// known not-found shapes to `None` instead.
    fn is_not_found(error: &str) -> bool {
        let lowered = error.to_lowercase();
        lowered.contains("not found")
            || lowered.contains("could not be found")
            || lowered.contains("-25300")
            || lowered.contains("errsecitemnotfound")
    }

    fn search(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let mut options = ItemSearchOptions::new();
        options
            .class(ItemClass::generic_password())
            .service(&self.service_name)
            .account(key)
            .limit(Limit::Max(1))
            .load_data(true);

        match options.search() {
            Ok(results) => {
                if let Some(SearchResult::Data(data)) = results.into_iter().next() {
                    Ok(Some(data))
                } else {
                    Ok(None)
                }
            }
            Err(e) if Self::is_not_found(&e.to_string()) => Ok(None),
            Err(e) => Err(StoreError::Platform(format!(
                "Failed to get keychain item: {}",
                e
            ))),
        }
    }
}

impl SecureStore for KeychainStore {
    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        debug!(service = %self.service_name, key = %key, "Setting keychain item");

        // Delete existing item first (ignore errors if it doesn't exist)
        let _ = delete_generic_password(&self.service_name, key);

        set_generic_password(&self.service_name, key, value.as_bytes())
            .map_err(|e| StoreError::Platform(format!("Failed to set keychain item: {}", e)))
    }

    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        debug!(service = %self.service_name, key = %key, "Getting keychain item");

        match self.search(key)? {
            Some(data) => {
                let value =
                    String::from_utf8(data).map_err(|e| StoreError::Encoding(e.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn get_bytes(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        debug!(service = %self.service_name, key = %key, "Getting keychain item as bytes");
        self.search(key)
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        debug!(service = %self.service_name, key = %key, "Deleting keychain item");

        match delete_generic_password(&self.service_name, key) {
            Ok(()) => Ok(true),
            Err(e) if Self::is_not_found(&e.to_string()) => Ok(false),
            Err(e) => Err(StoreError::Platform(format!(
                "Failed to delete keychain item: {}",
                e
            ))),
        }
    }
}
