//! Windows Credential Vault implementation.

use crate::{SecureStore, StoreError, StoreResult};
use tracing::debug;
use windows::{
    core::HSTRING,
    Security::Credentials::{PasswordCredential, PasswordVault},
};

/// ERROR_NOT_FOUND as surfaced through WinRT.
const ERROR_NOT_FOUND: u32 = 0x80070490;

/// Credential Vault backed secure storage for Windows.
pub struct CredentialVaultStore {
    resource_name: String,
}

impl CredentialVaultStore {
    pub fn new(service_name: &str) -> StoreResult<Self> {
        // Verify we can access the vault
        PasswordVault::new().map_err(|e| {
            StoreError::Platform(format!("Failed to access Credential Vault: {}", e))
        })?;

        Ok(Self {
            resource_name: service_name.to_string(),
        })
    }

    fn vault(&self) -> StoreResult<PasswordVault> {
        PasswordVault::new()
            .map_err(|e| StoreError::Platform(format!("Failed to access Credential Vault: {}", e)))
    }
}

impl SecureStore for CredentialVaultStore {
    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        debug!(resource = %self.resource_name, key = %key, "Setting credential");

        let vault = self.vault()?;

        // Delete existing credential first (ignore errors if it doesn't exist)
        let _ = self.delete(key);

        let credential = PasswordCredential::CreatePasswordCredential(
            &HSTRING::from(&self.resource_name),
            &HSTRING::from(key),
            &HSTRING::from(value),
        )
        .map_err(|e| StoreError::Platform(format!("Failed to create credential: {}", e)))?;

        vault
            .Add(&credential)
            .map_err(|e| StoreError::Platform(format!("Failed to add credential: {}", e)))
    }

    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        debug!(resource = %self.resource_name, key = %key, "Getting credential");

        let vault = self.vault()?;

        match vault.Retrieve(&HSTRING::from(&self.resource_name), &HSTRING::from(key)) {
            Ok(credential) => {
                // RetrievePassword must run before Password is populated
                credential.RetrievePassword().map_err(|e| {
                    StoreError::Platform(format!("Failed to retrieve password: {}", e))
                })?;

                let password = credential
                    .Password()
                    .map_err(|e| StoreError::Platform(format!("Failed to get password: {}", e)))?;

                Ok(Some(password.to_string()))
            }
            Err(e) if e.code().0 as u32 == ERROR_NOT_FOUND => Ok(None),
            Err(e) => Err(StoreError::Platform(format!(
                "Failed to retrieve credential: {}",
                e
            ))),
        }
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        debug!(resource = %self.resource_name, key = %key, "Deleting credential");

        let vault = self.vault()?;

        match vault.Retrieve(&HSTRING::from(&self.resource_name), &HSTRING::from(key)) {
            Ok(credential) => {
                vault.Remove(&credential).map_err(|e| {
                    StoreError::Platform(format!("Failed to remove credential: {}", e))
                })?;
                Ok(true)
            }
            Err(e) if e.code().0 as u32 == ERROR_NOT_FOUND => Ok(false),
            Err(e) => Err(StoreError::Platform(format!(
                "Failed to find credential for deletion: {}",
                e
            ))),
        }
    }
}
