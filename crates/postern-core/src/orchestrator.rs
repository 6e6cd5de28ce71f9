//! The [`Postern`] handle: construction, lifecycle, and background services.
//!
//! Construction hydrates cached snapshots synchronously, so a device that
//! has signed in before shows its identity immediately. [`Postern::load`]
//! then fetches the authoritative client and environment, starts the token
//! refresh worker, and wires up companion sync and device attestation when
//! the host registered them.

use crate::cache::SnapshotCache;
use crate::config::PosternConfig;
use crate::error::{PosternError, PosternResult};
use crate::lifecycle::{SdkMachine, SdkMachineInput, SdkPhase};
use crate::refresh::RefreshWorker;
use crate::state::{SessionState, StateChangeCallback};
use companion_sync::{ContextChannel, ContextHandle, ContextReader, ContextWriter, SyncCoordinator};
use device_attestation::{AttestationService, PlatformAttestor};
use postern_api::{ApiClient, ApiError};
use postern_resources::{Client, Environment, Session};
use postern_storage::{create_store, CredentialVault, SecureStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Entry point of the SDK.
///
/// One instance per device; cheap accessors, async operations for anything
/// that talks to the network.
pub struct Postern {
    pub(crate) config: PosternConfig,
    pub(crate) api: ApiClient,
    pub(crate) state: Arc<SessionState>,
    pub(crate) cache: SnapshotCache,
    pub(crate) vault: Arc<CredentialVault>,
    pub(crate) machine: Mutex<SdkMachine>,
    pub(crate) refresh: RefreshWorker,
    pub(crate) sync: Mutex<Option<Arc<SyncCoordinator>>>,
    pub(crate) attestation: Mutex<Option<Arc<AttestationService>>>,
    sync_started: AtomicBool,
}

impl std::fmt::Debug for Postern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Postern").finish_non_exhaustive()
    }
}

/// Bridges the sync coordinator onto the shared session state.
///
/// Writes arriving from a peer device land here: they update in-memory
/// state (which notifies the host) and refresh the snapshot cache. They are
/// not pushed back out; the coordinator suppresses its own echo while a
/// merge is applied.
struct SyncedContext {
    state: Arc<SessionState>,
    cache: SnapshotCache,
}

impl ContextReader for SyncedContext {
    fn client(&self) -> Option<Client> {
        self.state.client()
    }

    fn environment(&self) -> Option<Environment> {
        self.state.environment()
    }
}

impl ContextWriter for SyncedContext {
    fn set_client(&self, client: Client) {
        self.cache.save_client(&client);
        self.state.set_client(client);
    }

    fn clear_client(&self) {
        self.cache.clear_client();
        self.state.clear_client();
    }

    fn set_environment(&self, environment: Environment) {
        self.cache.save_environment(&environment);
        self.state.set_environment(environment);
    }
}

impl Postern {
    /// Create an instance backed by the platform secure store.
    pub fn new(config: PosternConfig) -> PosternResult<Self> {
        let store: Arc<dyn SecureStore> = Arc::from(create_store()?);
        Self::with_store(config, store)
    }

    /// Create an instance backed by an explicit store.
    ///
    /// Hosts without a platform keychain (and tests) pass a
    /// [`postern_storage::MemoryStore`] here.
    pub fn with_store(config: PosternConfig, store: Arc<dyn SecureStore>) -> PosternResult<Self> {
        let origin = config.api_origin()?;
        let vault = Arc::new(CredentialVault::new(store));
        let api = ApiClient::new(origin, config.publishable_key.clone(), vault.clone());
        let state = Arc::new(SessionState::new());
        let cache = SnapshotCache::new(vault.clone());

        if let Some(client) = cache.load_client() {
            debug!(client_id = %client.id, "Restored cached client");
            state.set_client_if_absent(client);
        }
        if let Some(environment) = cache.load_environment() {
            debug!("Restored cached environment");
            state.set_environment_if_absent(environment);
        }

        let refresh = RefreshWorker::new(
            api.clone(),
            state.clone(),
            config.refresh_interval,
            config.token_leeway,
        );

        Ok(Self {
            config,
            api,
            state,
            cache,
            vault,
            machine: Mutex::new(SdkMachine::new()),
            refresh,
            sync: Mutex::new(None),
            attestation: Mutex::new(None),
            sync_started: AtomicBool::new(false),
        })
    }

    /// Register a transport for cross-device state sync.
    ///
    /// Call before [`Postern::load`]; the sync worker starts once the SDK
    /// loads.
    pub fn enable_companion_sync(&self, channel: Arc<dyn ContextChannel>) -> PosternResult<()> {
        let context: ContextHandle = Arc::new(SyncedContext {
            state: self.state.clone(),
            cache: self.cache.clone(),
        });
        let coordinator = SyncCoordinator::new(
            self.config.device_role,
            channel,
            self.vault.clone(),
            context,
        )?;
        let mut slot = self.sync.lock().expect("lock poisoned");
        *slot = Some(Arc::new(coordinator));
        Ok(())
    }

    /// Register the platform attestor.
    ///
    /// Attestation only runs when the fetched environment demands it.
    pub fn enable_device_attestation(
        &self,
        attestor: Arc<dyn PlatformAttestor>,
        app_id: impl Into<String>,
    ) {
        let service = AttestationService::new(
            self.api.clone(),
            self.vault.clone(),
            attestor,
            app_id,
        );
        let mut slot = self.attestation.lock().expect("lock poisoned");
        *slot = Some(Arc::new(service));
    }

    /// Register the host callback fired after every client change.
    pub fn set_state_callback(&self, callback: StateChangeCallback) {
        self.state.set_state_callback(callback);
    }

    // ==========================================
    // State accessors
    // ==========================================

    pub fn phase(&self) -> SdkPhase {
        let machine = self.machine.lock().expect("lock poisoned");
        SdkPhase::from(machine.state())
    }

    pub fn client(&self) -> Option<Client> {
        self.state.client()
    }

    pub fn environment(&self) -> Option<Environment> {
        self.state.environment()
    }

    pub fn is_signed_in(&self) -> bool {
        self.state.is_signed_in()
    }

    /// The session currently serving this device, if any.
    pub fn active_session(&self) -> Option<Session> {
        let client = self.state.client()?;
        client.last_active_session().cloned()
    }

    // ==========================================
    // Lifecycle
    // ==========================================

    /// Fetch the authoritative client and environment, then start
    /// background services.
    ///
    /// On failure the lifecycle returns to idle and the cause is surfaced
    /// as [`PosternError::Initialization`]; any cached state hydrated at
    /// construction stays visible, so an offline device keeps its identity
    /// and the host simply retries.
    pub async fn load(&self) -> PosternResult<()> {
        self.transition(&SdkMachineInput::LoadStarted)?;

        match self.fetch_remote().await {
            Ok(()) => {
                self.transition(&SdkMachineInput::LoadSucceeded)?;
                self.start_services();
                debug!("SDK loaded");
                Ok(())
            }
            Err(err) => {
                let _ = self.transition(&SdkMachineInput::LoadFailed);
                let err = PosternError::Initialization(Box::new(err));
                if err.is_transient() && self.state.client().is_some() {
                    warn!(error = %err, "Load failed, continuing on cached state");
                }
                Err(err)
            }
        }
    }

    /// Pause background refresh while the app is backgrounded.
    pub fn handle_background(&self) {
        if self.transition(&SdkMachineInput::EnteredBackground).is_ok() {
            self.refresh.stop();
            debug!("Entered background, token refresh paused");
        }
    }

    /// Resume refresh and refetch state after the app returns.
    pub async fn handle_foreground(&self) {
        if self.transition(&SdkMachineInput::EnteredForeground).is_err() {
            return;
        }
        self.refresh.start();
        if let Err(err) = self.fetch_remote().await {
            warn!(error = %err, "Foreground refetch failed");
        }
    }

    /// Stop background services. State stays readable.
    pub fn shutdown(&self) {
        self.refresh.stop();
        debug!("SDK shut down");
    }

    // ==========================================
    // Internals
    // ==========================================

    /// Drive the lifecycle machine, mapping rejected inputs to an error.
    fn transition(&self, input: &SdkMachineInput) -> PosternResult<()> {
        let mut machine = self.machine.lock().expect("lock poisoned");
        machine.consume(input).map_err(|_| {
            PosternError::InvalidStateTransition(format!(
                "Cannot apply {:?} in phase {:?}",
                input,
                SdkPhase::from(machine.state())
            ))
        })?;
        Ok(())
    }

    /// Fetch client and environment concurrently and apply both.
    async fn fetch_remote(&self) -> PosternResult<()> {
        let (client, environment) =
            tokio::try_join!(self.fetch_or_create_client(), self.fetch_environment())?;

        self.state.set_environment(environment.clone());
        self.cache.save_environment(&environment);
        if let Some(client) = client {
            self.adopt_client(client);
        }
        Ok(())
    }

    /// GET the device's client, creating one when the server has none for
    /// this device yet.
    async fn fetch_or_create_client(&self) -> PosternResult<Option<Client>> {
        match self.api.get_client().await {
            Ok(envelope) => Ok(Some(envelope.response)),
            Err(ApiError::Remote { status, .. }) if status == 401 || status == 404 => {
                debug!("No client on this device yet, creating one");
                let envelope = self.api.create_client().await?;
                Ok(Some(envelope.response))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn fetch_environment(&self) -> PosternResult<Environment> {
        Ok(self.api.get_environment().await?)
    }

    /// Adopt a server-returned client: persist, publish, and share it.
    pub(crate) fn adopt_client(&self, client: Client) {
        self.cache.save_client(&client);
        self.state.set_client(client);
        self.propagate_context();
    }

    /// Push current state to the companion, when sync is enabled.
    pub(crate) fn propagate_context(&self) {
        let sync = self.sync.lock().expect("lock poisoned").clone();
        if let Some(sync) = sync {
            if let Err(err) = sync.push_context() {
                debug!(error = %err, "Context push skipped");
            }
        }
    }

    fn start_services(&self) {
        self.refresh.start();

        // The sync worker consumes the channel's event stream, which can
        // only be taken once; reloads must not start it again.
        if !self.sync_started.swap(true, Ordering::SeqCst) {
            let sync = self.sync.lock().expect("lock poisoned").clone();
            if let Some(sync) = sync {
                sync.start();
                if let Err(err) = sync.push_context() {
                    debug!(error = %err, "Initial context push skipped");
                }
            }
        } else {
            self.propagate_context();
        }

        self.maybe_attest();
    }

    /// Kick off device attestation when the environment demands it and the
    /// device holds no accepted key yet. Runs in the background; failures
    /// are logged and retried on the next load.
    fn maybe_attest(&self) {
        let Some(environment) = self.state.environment() else {
            return;
        };
        if !environment.fraud.device_attestation_mode.requires_attestation() {
            return;
        }
        let Some(service) = self.attestation.lock().expect("lock poisoned").clone() else {
            warn!("Authority requires device attestation but no attestor is registered");
            return;
        };
        match service.has_key() {
            Ok(true) => return,
            Ok(false) => {}
            Err(err) => {
                warn!(error = %err, "Could not check for an attestation key");
                return;
            }
        }
        tokio::spawn(async move {
            if let Err(err) = service.perform_device_attestation().await {
                warn!(error = %err, "Device attestation failed");
            }
        });
    }
}
