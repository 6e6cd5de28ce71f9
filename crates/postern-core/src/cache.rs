//! Snapshot cache for offline starts.
//!
//! Serialized client and environment snapshots live in the credential vault
//! next to the device token. Cache failures are logged and swallowed: a
//! broken cache degrades to a cold start, it never fails an operation.

use postern_resources::{Client, Environment};
use postern_storage::CredentialVault;
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct SnapshotCache {
    vault: Arc<CredentialVault>,
}

impl SnapshotCache {
    pub fn new(vault: Arc<CredentialVault>) -> Self {
        Self { vault }
    }

    /// Restore the cached client, if a readable one exists.
    ///
    /// An unreadable snapshot is discarded on sight so it cannot shadow
    /// future saves.
    pub fn load_client(&self) -> Option<Client> {
        let json = match self.vault.client_snapshot() {
            Ok(Some(json)) => json,
            Ok(None) => return None,
            Err(err) => {
                warn!(error = %err, "Failed to read client snapshot");
                return None;
            }
        };
        match Client::from_json(&json) {
            Ok(client) => Some(client),
            Err(err) => {
                warn!(error = %err, "Discarding unreadable client snapshot");
                let _ = self.vault.clear_client_snapshot();
                None
            }
        }
    }

    pub fn save_client(&self, client: &Client) {
        match client.to_json() {
            Ok(json) => {
                if let Err(err) = self.vault.set_client_snapshot(&json) {
                    warn!(error = %err, "Failed to persist client snapshot");
                }
            }
            Err(err) => warn!(error = %err, "Failed to serialize client snapshot"),
        }
    }

    pub fn clear_client(&self) {
        if let Err(err) = self.vault.clear_client_snapshot() {
            warn!(error = %err, "Failed to clear client snapshot");
        }
    }

    /// Restore the cached environment. An empty snapshot means the device
    /// never completed a fetch, so it is not restored.
    pub fn load_environment(&self) -> Option<Environment> {
        let json = match self.vault.environment_snapshot() {
            Ok(Some(json)) => json,
            Ok(None) => return None,
            Err(err) => {
                warn!(error = %err, "Failed to read environment snapshot");
                return None;
            }
        };
        match Environment::from_json(&json) {
            Ok(environment) if environment.is_empty() => None,
            Ok(environment) => Some(environment),
            Err(err) => {
                warn!(error = %err, "Discarding unreadable environment snapshot");
                None
            }
        }
    }

    pub fn save_environment(&self, environment: &Environment) {
        match environment.to_json() {
            Ok(json) => {
                if let Err(err) = self.vault.set_environment_snapshot(&json) {
                    warn!(error = %err, "Failed to persist environment snapshot");
                }
            }
            Err(err) => warn!(error = %err, "Failed to serialize environment snapshot"),
        }
    }
}
