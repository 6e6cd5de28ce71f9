//! Wire payloads and seams for cross-device context sync.
//!
//! The [`ContextChannel`] trait abstracts the transport (Bluetooth relay,
//! loopback, a future cloud relay); the [`LocalContext`] traits abstract the
//! state owner that updates are merged into.

use crate::error::SyncResult;
use chrono::{DateTime, Utc};
use postern_resources::{Client, Environment};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Which side of the device pair this instance plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceRole {
    /// Owns authentication: runs sign-in flows and seeds the companion.
    Primary,
    /// Mirrors the primary's authentication context.
    Companion,
}

/// Client portion of a context update.
///
/// `SignedOut` is a deliberate instruction to clear local state; it is not
/// the same as omitting the client, which merely means the sender has
/// nothing to say about it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "state", content = "client", rename_all = "snake_case")]
pub enum ClientSlot {
    Present(Client),
    SignedOut,
}

/// A snapshot of authentication context sent between paired devices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextUpdate {
    /// Installation id of the sending device, used to drop self-echoes.
    pub sender_instance_id: String,
    /// Opaque device token, when the sender has one to share.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_token: Option<String>,
    /// Client state, or the signed-out sentinel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientSlot>,
    /// Instance-level environment settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
    /// When the sender captured this snapshot.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub sent_at: DateTime<Utc>,
}

/// Events surfaced by a context transport.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// The transport became reachable; a full snapshot exchange should follow.
    Activated,
    /// A context update arrived from the paired device.
    ContextReceived(ContextUpdate),
}

/// Transport seam between paired devices.
///
/// Implementations queue outbound updates and surface inbound traffic as
/// [`ChannelEvent`]s. Sends are fire-and-forget from the caller's point of
/// view; delivery failures show up as a later `Activated` re-sync.
pub trait ContextChannel: Send + Sync {
    /// Whether the paired device can currently be reached.
    fn is_reachable(&self) -> bool;

    /// Queues a context update for delivery to the paired device.
    fn send_context(&self, update: ContextUpdate) -> SyncResult<()>;

    /// Hands out the inbound event stream.
    ///
    /// Returns `Some` exactly once; the coordinator's worker consumes it.
    fn take_events(&self) -> Option<mpsc::Receiver<ChannelEvent>>;
}

/// Read access to the locally owned authentication context.
pub trait ContextReader: Send + Sync {
    /// Current client copy, if this device holds one.
    fn client(&self) -> Option<Client>;

    /// Current environment copy, if this device holds one.
    fn environment(&self) -> Option<Environment>;
}

/// Write access to the locally owned authentication context.
///
/// Called only after the merge policy accepted an incoming value.
pub trait ContextWriter: Send + Sync {
    fn set_client(&self, client: Client);

    /// Clears the client in response to a signed-out sentinel.
    fn clear_client(&self);

    fn set_environment(&self, environment: Environment);
}

/// Combined trait for local context access.
pub trait LocalContext: ContextReader + ContextWriter {}

impl<T: ContextReader + ContextWriter> LocalContext for T {}

/// Thread-safe handle to the local context owner.
pub type ContextHandle = std::sync::Arc<dyn LocalContext>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn client_at(updated_at_ms: i64) -> Client {
        serde_json::from_value(json!({
            "id": "client_1",
            "sessions": [],
            "updated_at": updated_at_ms
        }))
        .unwrap()
    }

    #[test]
    fn device_role_uses_snake_case() {
        assert_eq!(
            serde_json::to_value(DeviceRole::Primary).unwrap(),
            json!("primary")
        );
        assert_eq!(
            serde_json::to_value(DeviceRole::Companion).unwrap(),
            json!("companion")
        );
    }

    #[test]
    fn signed_out_sentinel_is_distinct_from_absence() {
        let sentinel = ContextUpdate {
            sender_instance_id: "inst_a".to_string(),
            device_token: None,
            client: Some(ClientSlot::SignedOut),
            environment: None,
            sent_at: Utc.timestamp_millis_opt(1_000).single().unwrap(),
        };
        let silent = ContextUpdate {
            client: None,
            ..sentinel.clone()
        };

        let sentinel_json = serde_json::to_value(&sentinel).unwrap();
        assert_eq!(sentinel_json["client"], json!({"state": "signed_out"}));

        let silent_json = serde_json::to_value(&silent).unwrap();
        assert!(silent_json.get("client").is_none());
    }

    #[test]
    fn context_update_roundtrips() {
        let update = ContextUpdate {
            sender_instance_id: "inst_a".to_string(),
            device_token: Some("dvb_token".to_string()),
            client: Some(ClientSlot::Present(client_at(1_719_400_000_000))),
            environment: None,
            sent_at: Utc.timestamp_millis_opt(1_719_400_000_123).single().unwrap(),
        };

        let encoded = serde_json::to_string(&update).unwrap();
        let decoded: ContextUpdate = serde_json::from_str(&encoded).unwrap();

        assert_eq!(decoded.sender_instance_id, "inst_a");
        assert_eq!(decoded.device_token.as_deref(), Some("dvb_token"));
        assert_eq!(decoded.sent_at, update.sent_at);
        match decoded.client {
            Some(ClientSlot::Present(client)) => assert_eq!(client.id, "client_1"),
            other => panic!("expected present client, got {:?}", other),
        }
    }

    #[test]
    fn sent_at_serializes_as_epoch_millis() {
        let update = ContextUpdate {
            sender_instance_id: "inst_a".to_string(),
            device_token: None,
            client: None,
            environment: None,
            sent_at: Utc.timestamp_millis_opt(42_000).single().unwrap(),
        };
        let encoded = serde_json::to_value(&update).unwrap();
        assert_eq!(encoded["sent_at"], json!(42_000));
    }
}
