//! Storage key constants.

/// Keys for every entry the SDK persists
pub struct StoreKeys;

impl StoreKeys {
    /// Cached client snapshot (JSON)
    pub const CLIENT_SNAPSHOT: &'static str = "client_snapshot";

    /// Cached environment snapshot (JSON)
    pub const ENVIRONMENT_SNAPSHOT: &'static str = "environment_snapshot";

    /// Opaque device token issued by the authority
    pub const DEVICE_TOKEN: &'static str = "device_token";

    /// Set once the first cross-device context sync has completed
    pub const CONTEXT_SYNCED: &'static str = "context_synced";

    /// Attestation key id, stored only after server-side verification
    pub const ATTESTATION_KEY_ID: &'static str = "attestation_key_id";

    /// Locally generated UUID identifying this install
    pub const DEVICE_INSTANCE_ID: &'static str = "device_instance_id";
}
