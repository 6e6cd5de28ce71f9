//! Background session token refresh.
//!
//! One worker per SDK instance keeps the active session's token fresh on a
//! fixed cadence. Minting is skipped while the cached token is comfortably
//! inside its lifetime, so restarts and foreground flaps do not multiply
//! requests.

use crate::state::SessionState;
use chrono::Utc;
use postern_api::ApiClient;
use session_token_codec::SessionToken;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

pub struct RefreshWorker {
    api: ApiClient,
    state: Arc<SessionState>,
    interval: Duration,
    leeway: chrono::Duration,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
}

impl RefreshWorker {
    pub fn new(
        api: ApiClient,
        state: Arc<SessionState>,
        interval: Duration,
        leeway: Duration,
    ) -> Self {
        Self {
            api,
            state,
            interval,
            leeway: chrono::Duration::milliseconds(leeway.as_millis() as i64),
            shutdown: Mutex::new(None),
        }
    }

    /// Start the refresh loop. A no-op when already running.
    ///
    /// The first pass runs immediately, so a device that just signed in
    /// holds a token well before the first full interval elapses.
    pub fn start(&self) {
        let mut slot = self.shutdown.lock().expect("lock poisoned");
        if slot.is_some() {
            debug!("Refresh worker already running");
            return;
        }
        let (tx, mut rx) = oneshot::channel();
        *slot = Some(tx);

        let api = self.api.clone();
        let state = self.state.clone();
        let interval = self.interval;
        let leeway = self.leeway;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = &mut rx => {
                        debug!("Refresh worker stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        refresh_active_token(&api, &state, leeway).await;
                    }
                }
            }
        });
        debug!(interval = ?interval, "Refresh worker started");
    }

    /// Stop the refresh loop. A no-op when not running.
    pub fn stop(&self) {
        if let Some(tx) = self.shutdown.lock().expect("lock poisoned").take() {
            let _ = tx.send(());
        }
    }

    pub fn is_running(&self) -> bool {
        self.shutdown.lock().expect("lock poisoned").is_some()
    }
}

/// One refresh pass: mint a token for the active session when the cached
/// one is stale or missing.
pub(crate) async fn refresh_active_token(
    api: &ApiClient,
    state: &SessionState,
    leeway: chrono::Duration,
) {
    let Some(session_id) = state.active_session_id() else {
        return;
    };
    if let Some(token) = state.session_token(&session_id) {
        if !token.is_expired(Utc::now(), leeway) {
            return;
        }
    }

    match api.mint_session_token(&session_id).await {
        Ok(minted) => match SessionToken::decode(&minted.jwt) {
            Ok(token) => {
                debug!(session_id = %session_id, "Session token refreshed");
                state.store_token(&session_id, token);
            }
            Err(err) => warn!(error = %err, "Minted session token failed to decode"),
        },
        Err(err) if err.is_transient() => {
            debug!(error = %err, session_id = %session_id, "Token refresh deferred");
        }
        Err(err) => {
            warn!(
                error = %err,
                session_id = %session_id,
                "Token refresh rejected, dropping cached token"
            );
            state.remove_token(&session_id);
        }
    }
}
