//! Sync coordinator: wires a context transport to the local state owner.

use crate::error::SyncResult;
use crate::merge;
use crate::payload::{
    ChannelEvent, ClientSlot, ContextChannel, ContextHandle, ContextUpdate, DeviceRole,
};
use chrono::Utc;
use postern_storage::CredentialVault;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Drives cross-device context sync for one side of a device pair.
///
/// Consumes the transport's event stream on a background task, merges
/// incoming updates through the policy in [`merge`], and pushes local
/// snapshots when the channel activates or the host asks for it.
///
/// # Thread Safety
///
/// The coordinator is shared behind `Arc` and all methods take `&self`.
/// While a remote update is being applied, outbound pushes are suppressed
/// so a merge can never echo back to its sender.
pub struct SyncCoordinator {
    role: DeviceRole,
    /// This installation's id, stamped on outbound updates and used to
    /// drop self-echoes on the inbound path.
    instance_id: String,
    channel: Arc<dyn ContextChannel>,
    vault: Arc<CredentialVault>,
    context: ContextHandle,
    /// True while a remote update is being applied.
    merging: Arc<AtomicBool>,
}

impl SyncCoordinator {
    /// Creates a coordinator for the given role.
    ///
    /// Reads (or mints) the device instance id from the vault, so this can
    /// fail when secure storage is unavailable.
    pub fn new(
        role: DeviceRole,
        channel: Arc<dyn ContextChannel>,
        vault: Arc<CredentialVault>,
        context: ContextHandle,
    ) -> SyncResult<Self> {
        let instance_id = vault.device_instance_id()?;
        Ok(Self {
            role,
            instance_id,
            channel,
            vault,
            context,
            merging: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn role(&self) -> DeviceRole {
        self.role
    }

    /// Starts the background worker consuming the transport's event stream.
    ///
    /// # Panics
    ///
    /// Panics if called more than once (the event stream can only be taken
    /// once).
    pub fn start(&self) {
        let Some(mut receiver) = self.channel.take_events() else {
            panic!("Context sync worker already started");
        };

        let role = self.role;
        let instance_id = self.instance_id.clone();
        let channel = self.channel.clone();
        let vault = self.vault.clone();
        let context = self.context.clone();
        let merging = self.merging.clone();

        tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                match event {
                    ChannelEvent::Activated => {
                        debug!("Context channel activated, pushing snapshot");
                        if let Err(err) = send_snapshot(&channel, &vault, &context, &instance_id)
                        {
                            warn!(error = %err, "Snapshot push after activation failed");
                        }
                    }
                    ChannelEvent::ContextReceived(update) => {
                        apply_update(role, &vault, &context, &merging, &instance_id, update);
                    }
                }
            }
            debug!("Context sync worker stopped (channel closed)");
        });
    }

    /// Pushes the current local context to the paired device.
    ///
    /// A no-op while a remote update is being applied or while the pair is
    /// unreachable; the next channel activation re-syncs in both cases.
    pub fn push_context(&self) -> SyncResult<()> {
        if self.merging.load(Ordering::SeqCst) {
            debug!("Skipping context push (merge in progress)");
            return Ok(());
        }
        send_snapshot(&self.channel, &self.vault, &self.context, &self.instance_id)
    }

    /// Tells the paired device that this device signed out.
    pub fn announce_signed_out(&self) -> SyncResult<()> {
        if self.merging.load(Ordering::SeqCst) {
            debug!("Skipping sign-out announcement (merge in progress)");
            return Ok(());
        }
        if !self.channel.is_reachable() {
            debug!("Skipping sign-out announcement (paired device unreachable)");
            return Ok(());
        }

        self.channel.send_context(ContextUpdate {
            sender_instance_id: self.instance_id.clone(),
            device_token: None,
            client: Some(ClientSlot::SignedOut),
            environment: None,
            sent_at: Utc::now(),
        })
    }
}

/// Sends a full snapshot of the local context to the paired device.
fn send_snapshot(
    channel: &Arc<dyn ContextChannel>,
    vault: &Arc<CredentialVault>,
    context: &ContextHandle,
    instance_id: &str,
) -> SyncResult<()> {
    if !channel.is_reachable() {
        debug!("Skipping context push (paired device unreachable)");
        return Ok(());
    }

    channel.send_context(ContextUpdate {
        sender_instance_id: instance_id.to_string(),
        device_token: vault.device_token()?,
        client: context.client().map(ClientSlot::Present),
        environment: context.environment(),
        sent_at: Utc::now(),
    })?;

    if !vault.context_synced()? {
        vault.mark_context_synced()?;
    }
    Ok(())
}

fn apply_update(
    role: DeviceRole,
    vault: &Arc<CredentialVault>,
    context: &ContextHandle,
    merging: &Arc<AtomicBool>,
    own_instance_id: &str,
    update: ContextUpdate,
) {
    if update.sender_instance_id == own_instance_id {
        debug!("Dropping self-echoed context update");
        return;
    }

    merging.store(true, Ordering::SeqCst);
    if let Err(err) = merge_into_local(role, vault, context, update) {
        warn!(error = %err, "Context merge failed");
    }
    merging.store(false, Ordering::SeqCst);
}

fn merge_into_local(
    role: DeviceRole,
    vault: &Arc<CredentialVault>,
    context: &ContextHandle,
    update: ContextUpdate,
) -> SyncResult<()> {
    if let Some(token) = update.device_token {
        let already_synced = vault.context_synced()?;
        if merge::should_accept_device_token(role, already_synced) {
            vault.set_device_token(&token)?;
            if !already_synced {
                vault.mark_context_synced()?;
            }
            debug!("Accepted device token from paired device");
        } else {
            debug!("Kept local device token (first exchange pending)");
        }
    }

    match update.client {
        Some(ClientSlot::SignedOut) => {
            info!("Applying signed-out state from paired device");
            context.clear_client();
        }
        Some(ClientSlot::Present(incoming)) => {
            let local_updated_at = context.client().map(|client| client.updated_at);
            if merge::should_accept_client(role, local_updated_at, incoming.updated_at) {
                debug!(client_id = %incoming.id, "Accepting client from paired device");
                context.set_client(incoming);
            } else {
                debug!(client_id = %incoming.id, "Keeping local client (not older)");
            }
        }
        None => {}
    }

    if let Some(environment) = update.environment {
        context.set_environment(environment);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::InMemoryChannel;
    use crate::payload::{ContextReader, ContextWriter};
    use postern_resources::{Client, Environment};
    use postern_storage::MemoryStore;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use tokio::time::{sleep, Duration};

    // =========================================================================
    // Mock implementations
    // =========================================================================

    struct RecordingContext {
        client: Mutex<Option<Client>>,
        environment: Mutex<Option<Environment>>,
        clear_count: AtomicUsize,
    }

    impl RecordingContext {
        fn new() -> Self {
            Self {
                client: Mutex::new(None),
                environment: Mutex::new(None),
                clear_count: AtomicUsize::new(0),
            }
        }

        fn seed_client(&self, client: Client) {
            *self.client.lock().unwrap() = Some(client);
        }

        fn clears(&self) -> usize {
            self.clear_count.load(Ordering::SeqCst)
        }
    }

    impl ContextReader for RecordingContext {
        fn client(&self) -> Option<Client> {
            self.client.lock().unwrap().clone()
        }

        fn environment(&self) -> Option<Environment> {
            self.environment.lock().unwrap().clone()
        }
    }

    impl ContextWriter for RecordingContext {
        fn set_client(&self, client: Client) {
            *self.client.lock().unwrap() = Some(client);
        }

        fn clear_client(&self) {
            self.clear_count.fetch_add(1, Ordering::SeqCst);
            *self.client.lock().unwrap() = None;
        }

        fn set_environment(&self, environment: Environment) {
            *self.environment.lock().unwrap() = Some(environment);
        }
    }

    // =========================================================================
    // Fixtures
    // =========================================================================

    fn client_at(id: &str, updated_at_ms: i64) -> Client {
        serde_json::from_value(json!({
            "id": id,
            "sessions": [],
            "updated_at": updated_at_ms
        }))
        .unwrap()
    }

    fn update_from_peer(client: Option<ClientSlot>) -> ContextUpdate {
        ContextUpdate {
            sender_instance_id: "inst_peer".to_string(),
            device_token: None,
            client,
            environment: None,
            sent_at: Utc::now(),
        }
    }

    struct Fixture {
        coordinator: SyncCoordinator,
        own: Arc<InMemoryChannel>,
        peer: InMemoryChannel,
        context: Arc<RecordingContext>,
        vault: Arc<CredentialVault>,
    }

    fn fixture(role: DeviceRole) -> Fixture {
        let (own, peer) = InMemoryChannel::pair();
        let own = Arc::new(own);
        let vault = Arc::new(CredentialVault::new(Arc::new(MemoryStore::new())));
        let context = Arc::new(RecordingContext::new());
        let coordinator =
            SyncCoordinator::new(role, own.clone(), vault.clone(), context.clone()).unwrap();
        Fixture {
            coordinator,
            own,
            peer,
            context,
            vault,
        }
    }

    // =========================================================================
    // Device token merge
    // =========================================================================

    #[tokio::test]
    async fn companion_accepts_first_device_token_and_marks_synced() {
        let f = fixture(DeviceRole::Companion);
        f.coordinator.start();

        let mut update = update_from_peer(None);
        update.device_token = Some("dvb_from_primary".to_string());
        f.peer.send_context(update).unwrap();
        sleep(Duration::from_millis(50)).await;

        assert_eq!(
            f.vault.device_token().unwrap(),
            Some("dvb_from_primary".to_string())
        );
        assert!(f.vault.context_synced().unwrap());
    }

    #[tokio::test]
    async fn primary_keeps_own_token_before_first_exchange() {
        let f = fixture(DeviceRole::Primary);
        f.vault.set_device_token("dvb_local").unwrap();
        f.coordinator.start();

        let mut update = update_from_peer(None);
        update.device_token = Some("dvb_from_companion".to_string());
        f.peer.send_context(update).unwrap();
        sleep(Duration::from_millis(50)).await;

        assert_eq!(f.vault.device_token().unwrap(), Some("dvb_local".to_string()));
    }

    #[tokio::test]
    async fn primary_accepts_token_after_first_exchange() {
        let f = fixture(DeviceRole::Primary);
        f.vault.set_device_token("dvb_local").unwrap();
        f.vault.mark_context_synced().unwrap();
        f.coordinator.start();

        let mut update = update_from_peer(None);
        update.device_token = Some("dvb_rotated".to_string());
        f.peer.send_context(update).unwrap();
        sleep(Duration::from_millis(50)).await;

        assert_eq!(
            f.vault.device_token().unwrap(),
            Some("dvb_rotated".to_string())
        );
    }

    // =========================================================================
    // Client merge
    // =========================================================================

    #[tokio::test]
    async fn newer_client_replaces_local_copy() {
        let f = fixture(DeviceRole::Primary);
        f.context.seed_client(client_at("client_old", 1_000));
        f.coordinator.start();

        let incoming = client_at("client_new", 2_000);
        f.peer
            .send_context(update_from_peer(Some(ClientSlot::Present(incoming))))
            .unwrap();
        sleep(Duration::from_millis(50)).await;

        assert_eq!(f.context.client().unwrap().id, "client_new");
    }

    #[tokio::test]
    async fn primary_ignores_equal_and_older_clients() {
        let f = fixture(DeviceRole::Primary);
        f.context.seed_client(client_at("client_local", 2_000));
        f.coordinator.start();

        f.peer
            .send_context(update_from_peer(Some(ClientSlot::Present(client_at(
                "client_stale",
                1_000,
            )))))
            .unwrap();
        f.peer
            .send_context(update_from_peer(Some(ClientSlot::Present(client_at(
                "client_equal",
                2_000,
            )))))
            .unwrap();
        sleep(Duration::from_millis(50)).await;

        assert_eq!(f.context.client().unwrap().id, "client_local");
    }

    #[tokio::test]
    async fn companion_accepts_equal_timestamp() {
        let f = fixture(DeviceRole::Companion);
        f.context.seed_client(client_at("client_local", 2_000));
        f.coordinator.start();

        f.peer
            .send_context(update_from_peer(Some(ClientSlot::Present(client_at(
                "client_equal",
                2_000,
            )))))
            .unwrap();
        sleep(Duration::from_millis(50)).await;

        assert_eq!(f.context.client().unwrap().id, "client_equal");
    }

    #[tokio::test]
    async fn signed_out_sentinel_clears_even_when_local_is_newer() {
        let f = fixture(DeviceRole::Primary);
        f.context.seed_client(client_at("client_local", 9_000));
        f.coordinator.start();

        f.peer
            .send_context(update_from_peer(Some(ClientSlot::SignedOut)))
            .unwrap();
        sleep(Duration::from_millis(50)).await;

        assert!(f.context.client().is_none());
        assert_eq!(f.context.clears(), 1);
    }

    // =========================================================================
    // Echo filtering and environment
    // =========================================================================

    #[tokio::test]
    async fn self_echoed_update_is_dropped() {
        let f = fixture(DeviceRole::Companion);
        let own_id = f.vault.device_instance_id().unwrap();
        f.coordinator.start();

        let mut update = update_from_peer(None);
        update.sender_instance_id = own_id;
        update.device_token = Some("dvb_echo".to_string());
        f.peer.send_context(update).unwrap();
        sleep(Duration::from_millis(50)).await;

        assert_eq!(f.vault.device_token().unwrap(), None);
    }

    #[tokio::test]
    async fn environment_is_always_applied() {
        let f = fixture(DeviceRole::Primary);
        f.coordinator.start();

        let mut update = update_from_peer(None);
        update.environment = Some(Environment::default());
        f.peer.send_context(update).unwrap();
        sleep(Duration::from_millis(50)).await;

        assert!(f.context.environment().is_some());
    }

    // =========================================================================
    // Outbound pushes
    // =========================================================================

    #[tokio::test]
    async fn activation_pushes_full_snapshot_to_peer() {
        let f = fixture(DeviceRole::Primary);
        f.vault.set_device_token("dvb_local").unwrap();
        f.context.seed_client(client_at("client_local", 3_000));
        let mut peer_events = f.peer.take_events().unwrap();
        f.coordinator.start();

        f.own.activate();
        sleep(Duration::from_millis(50)).await;

        match peer_events.try_recv().unwrap() {
            ChannelEvent::ContextReceived(update) => {
                assert_eq!(update.device_token.as_deref(), Some("dvb_local"));
                assert!(matches!(update.client, Some(ClientSlot::Present(_))));
            }
            other => panic!("expected context event, got {:?}", other),
        }
        assert!(f.vault.context_synced().unwrap());
    }

    #[tokio::test]
    async fn push_is_skipped_while_unreachable() {
        let f = fixture(DeviceRole::Primary);
        let mut peer_events = f.peer.take_events().unwrap();
        f.own.set_reachable(false);

        f.coordinator.push_context().unwrap();

        assert!(peer_events.try_recv().is_err());
    }

    #[tokio::test]
    async fn sign_out_announcement_carries_the_sentinel() {
        let f = fixture(DeviceRole::Primary);
        let mut peer_events = f.peer.take_events().unwrap();

        f.coordinator.announce_signed_out().unwrap();

        match peer_events.try_recv().unwrap() {
            ChannelEvent::ContextReceived(update) => {
                assert!(matches!(update.client, Some(ClientSlot::SignedOut)));
                assert!(update.device_token.is_none());
            }
            other => panic!("expected context event, got {:?}", other),
        }
    }
}
