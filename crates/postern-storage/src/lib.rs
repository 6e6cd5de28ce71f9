//! Secure credential storage for the Postern device SDK.
//!
//! Platform-specific secure storage backends behind one trait:
//! - **macOS**: Keychain Access via `security-framework`
//! - **Linux**: Secret Service (GNOME Keyring / KWallet) via `secret-service`
//! - **Windows**: Credential Vault via `windows` crate
//!
//! [`MemoryStore`] is an in-process backend for tests and ephemeral hosts.

mod keys;
mod memory;
mod traits;
mod vault;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "windows")]
mod windows;

pub use keys::StoreKeys;
pub use memory::MemoryStore;
pub use traits::SecureStore;
pub use vault::CredentialVault;

use thiserror::Error;

/// Service name namespacing every entry this SDK writes.
pub const SERVICE_NAME: &str = "com.postern.device";

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Platform-specific storage error
    #[error("Platform storage error: {0}")]
    Platform(String),

    /// Key not found
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Create the default platform-specific storage backend.
pub fn create_store() -> StoreResult<Box<dyn SecureStore>> {
    #[cfg(target_os = "macos")]
    {
        let store = macos::KeychainStore::new(SERVICE_NAME)?;
        Ok(Box::new(store))
    }

    #[cfg(target_os = "linux")]
    {
        let store = linux::SecretServiceStore::new(SERVICE_NAME)?;
        Ok(Box::new(store))
    }

    #[cfg(target_os = "windows")]
    {
        let store = windows::CredentialVaultStore::new(SERVICE_NAME)?;
        Ok(Box::new(store))
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        Err(StoreError::Platform(
            "No secure storage implementation available for this platform".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trait_default_has_uses_get() {
        let store = MemoryStore::new();
        assert!(!store.has("missing").unwrap());

        store.set("present", "value").unwrap();
        assert!(store.has("present").unwrap());
    }

    #[test]
    fn trait_default_get_bytes_assumes_utf8() {
        let store = MemoryStore::new();
        store.set("key", "value").unwrap();
        assert_eq!(store.get_bytes("key").unwrap(), Some(b"value".to_vec()));
        assert_eq!(store.get_bytes("missing").unwrap(), None);
    }

    #[test]
    fn error_messages_name_the_key() {
        let err = StoreError::NotFound("device_token".to_string());
        assert_eq!(err.to_string(), "Key not found: device_token");
    }
}
