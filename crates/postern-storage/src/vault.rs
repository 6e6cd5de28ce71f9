//! High-level API over the secure store for the SDK's own entries.

use crate::{SecureStore, StoreKeys, StoreResult};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

const FLAG_TRUE: &str = "true";

/// Typed accessors for everything the SDK persists.
///
/// Shared by the transport (device token), the sync coordinator (synced
/// flag), the attestation service (key id), and the cache manager
/// (snapshots); all of them hold the same `Arc`.
pub struct CredentialVault {
    store: Arc<dyn SecureStore>,
}

impl CredentialVault {
    pub fn new(store: Arc<dyn SecureStore>) -> Self {
        Self { store }
    }

    // ==========================================
    // Device token
    // ==========================================

    pub fn device_token(&self) -> StoreResult<Option<String>> {
        self.store.get(StoreKeys::DEVICE_TOKEN)
    }

    pub fn set_device_token(&self, token: &str) -> StoreResult<()> {
        self.store.set(StoreKeys::DEVICE_TOKEN, token)
    }

    pub fn clear_device_token(&self) -> StoreResult<bool> {
        self.store.delete(StoreKeys::DEVICE_TOKEN)
    }

    // ==========================================
    // Cross-device sync flag
    // ==========================================

    /// Whether the first cross-device context sync has ever completed.
    pub fn context_synced(&self) -> StoreResult<bool> {
        Ok(self.store.get(StoreKeys::CONTEXT_SYNCED)?.as_deref() == Some(FLAG_TRUE))
    }

    pub fn mark_context_synced(&self) -> StoreResult<()> {
        self.store.set(StoreKeys::CONTEXT_SYNCED, FLAG_TRUE)
    }

    // ==========================================
    // Attestation key
    // ==========================================

    pub fn attestation_key_id(&self) -> StoreResult<Option<String>> {
        self.store.get(StoreKeys::ATTESTATION_KEY_ID)
    }

    pub fn set_attestation_key_id(&self, key_id: &str) -> StoreResult<()> {
        self.store.set(StoreKeys::ATTESTATION_KEY_ID, key_id)
    }

    pub fn clear_attestation_key_id(&self) -> StoreResult<bool> {
        self.store.delete(StoreKeys::ATTESTATION_KEY_ID)
    }

    // ==========================================
    // Device instance id
    // ==========================================

    /// Stable UUID identifying this install, generated on first use.
    pub fn device_instance_id(&self) -> StoreResult<String> {
        if let Some(id) = self.store.get(StoreKeys::DEVICE_INSTANCE_ID)? {
            return Ok(id);
        }

        let id = Uuid::new_v4().to_string();
        debug!(instance_id = %id, "Generated device instance id");
        self.store.set(StoreKeys::DEVICE_INSTANCE_ID, &id)?;
        Ok(id)
    }

    // ==========================================
    // Cached snapshots
    // ==========================================

    pub fn client_snapshot(&self) -> StoreResult<Option<String>> {
        self.store.get(StoreKeys::CLIENT_SNAPSHOT)
    }

    pub fn set_client_snapshot(&self, json: &str) -> StoreResult<()> {
        self.store.set(StoreKeys::CLIENT_SNAPSHOT, json)
    }

    pub fn clear_client_snapshot(&self) -> StoreResult<bool> {
        self.store.delete(StoreKeys::CLIENT_SNAPSHOT)
    }

    pub fn environment_snapshot(&self) -> StoreResult<Option<String>> {
        self.store.get(StoreKeys::ENVIRONMENT_SNAPSHOT)
    }

    pub fn set_environment_snapshot(&self, json: &str) -> StoreResult<()> {
        self.store.set(StoreKeys::ENVIRONMENT_SNAPSHOT, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    fn vault() -> CredentialVault {
        CredentialVault::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn device_token_lifecycle() {
        let vault = vault();
        assert_eq!(vault.device_token().unwrap(), None);

        vault.set_device_token("dvb_abc123").unwrap();
        assert_eq!(vault.device_token().unwrap(), Some("dvb_abc123".to_string()));

        assert!(vault.clear_device_token().unwrap());
        assert_eq!(vault.device_token().unwrap(), None);
        assert!(!vault.clear_device_token().unwrap());
    }

    #[test]
    fn context_synced_defaults_to_false() {
        let vault = vault();
        assert!(!vault.context_synced().unwrap());

        vault.mark_context_synced().unwrap();
        assert!(vault.context_synced().unwrap());
    }

    #[test]
    fn device_instance_id_is_stable() {
        let vault = vault();
        let first = vault.device_instance_id().unwrap();
        let second = vault.device_instance_id().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 36);
    }

    #[test]
    fn snapshots_store_raw_json() {
        let vault = vault();
        assert_eq!(vault.client_snapshot().unwrap(), None);

        vault.set_client_snapshot(r#"{"id":"client_1"}"#).unwrap();
        assert_eq!(
            vault.client_snapshot().unwrap(),
            Some(r#"{"id":"client_1"}"#.to_string())
        );

        vault
            .set_environment_snapshot(r#"{"display_config":{}}"#)
            .unwrap();
        assert!(vault.environment_snapshot().unwrap().is_some());

        assert!(vault.clear_client_snapshot().unwrap());
        assert_eq!(vault.client_snapshot().unwrap(), None);
    }
}
