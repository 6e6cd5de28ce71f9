//! In-memory authentication state shared across the SDK.
//!
//! [`SessionState`] is the single owner of the device's view of the client,
//! the environment snapshot, and minted session tokens. Every other
//! component reads and writes through it; nothing holds a second copy.
//! Locks are held only for the duration of one access and never across an
//! await point.

use postern_resources::{Client, Environment};
use serde::{Deserialize, Serialize};
use session_token_codec::SessionToken;
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

/// Callback invoked after the client changes.
pub type StateChangeCallback = Box<dyn Fn(StateChangedPayload) + Send + Sync>;

/// Snapshot handed to the state change callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateChangedPayload {
    /// Whether the client currently holds at least one active session.
    pub signed_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_session_id: Option<String>,
}

/// Exclusive owner of client, environment, and token state.
pub struct SessionState {
    client: RwLock<Option<Client>>,
    environment: RwLock<Option<Environment>>,
    tokens: Mutex<HashMap<String, SessionToken>>,
    callback: Mutex<Option<StateChangeCallback>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            client: RwLock::new(None),
            environment: RwLock::new(None),
            tokens: Mutex::new(HashMap::new()),
            callback: Mutex::new(None),
        }
    }

    pub fn client(&self) -> Option<Client> {
        self.client.read().expect("lock poisoned").clone()
    }

    /// Replace the client and notify the host.
    pub fn set_client(&self, client: Client) {
        {
            let mut guard = self.client.write().expect("lock poisoned");
            *guard = Some(client);
        }
        self.notify();
    }

    /// Install a client only when none is present yet.
    ///
    /// Used when restoring cached snapshots, so a fresh remote copy that
    /// arrived first is never clobbered by stale disk state.
    pub fn set_client_if_absent(&self, client: Client) -> bool {
        let installed = {
            let mut guard = self.client.write().expect("lock poisoned");
            if guard.is_some() {
                false
            } else {
                *guard = Some(client);
                true
            }
        };
        if installed {
            self.notify();
        }
        installed
    }

    /// Drop the client and every cached token.
    pub fn clear_client(&self) {
        {
            let mut guard = self.client.write().expect("lock poisoned");
            *guard = None;
        }
        self.clear_tokens();
        self.notify();
    }

    pub fn environment(&self) -> Option<Environment> {
        self.environment.read().expect("lock poisoned").clone()
    }

    pub fn set_environment(&self, environment: Environment) {
        let mut guard = self.environment.write().expect("lock poisoned");
        *guard = Some(environment);
    }

    /// Install an environment only when none is present yet.
    pub fn set_environment_if_absent(&self, environment: Environment) -> bool {
        let mut guard = self.environment.write().expect("lock poisoned");
        if guard.is_some() {
            false
        } else {
            *guard = Some(environment);
            true
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.client
            .read()
            .expect("lock poisoned")
            .as_ref()
            .map(Client::is_signed_in)
            .unwrap_or(false)
    }

    /// Id of the session the client considers active, if any.
    pub fn active_session_id(&self) -> Option<String> {
        let guard = self.client.read().expect("lock poisoned");
        guard
            .as_ref()
            .and_then(|client| client.last_active_session())
            .map(|session| session.id.clone())
    }

    pub fn session_token(&self, session_id: &str) -> Option<SessionToken> {
        self.tokens
            .lock()
            .expect("lock poisoned")
            .get(session_id)
            .cloned()
    }

    pub fn store_token(&self, session_id: &str, token: SessionToken) {
        self.tokens
            .lock()
            .expect("lock poisoned")
            .insert(session_id.to_string(), token);
    }

    pub fn remove_token(&self, session_id: &str) {
        self.tokens.lock().expect("lock poisoned").remove(session_id);
    }

    pub fn clear_tokens(&self) {
        self.tokens.lock().expect("lock poisoned").clear();
    }

    /// Register the host callback. Replaces any previous one.
    pub fn set_state_callback(&self, callback: StateChangeCallback) {
        let mut guard = self.callback.lock().expect("lock poisoned");
        *guard = Some(callback);
    }

    /// Snapshot current state and invoke the callback.
    ///
    /// The client lock is released before the callback runs, so the host
    /// may read state from inside it.
    fn notify(&self) {
        let payload = {
            let guard = self.client.read().expect("lock poisoned");
            StateChangedPayload {
                signed_in: guard.as_ref().map(Client::is_signed_in).unwrap_or(false),
                client_id: guard.as_ref().map(|client| client.id.clone()),
                active_session_id: guard
                    .as_ref()
                    .and_then(|client| client.last_active_session())
                    .map(|session| session.id.clone()),
            }
        };
        let guard = self.callback.lock().expect("lock poisoned");
        if let Some(callback) = guard.as_ref() {
            callback(payload);
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
