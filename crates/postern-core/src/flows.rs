//! Server-driven sign-in, sign-up, and session operations.
//!
//! Every operation round-trips through the frontend API. The envelope's
//! piggybacked client is authoritative and is adopted wholesale on success
//! and on structured failure alike, so local state always reflects what the
//! server last said, even when the operation itself was rejected.

use crate::error::{PosternError, PosternResult};
use crate::orchestrator::Postern;
use chrono::Utc;
use postern_api::{
    ApiError, AttemptFirstFactorParams, AttemptSecondFactorParams,
    AttemptSignUpVerificationParams, CreateSignInParams, Envelope, PrepareFirstFactorParams,
    PrepareSecondFactorParams, PrepareSignUpVerificationParams, SignUpParams, TouchSessionParams,
};
use postern_resources::{SignIn, SignUp};
use session_token_codec::SessionToken;
use tracing::{debug, warn};

impl Postern {
    // ==========================================
    // Sign-in
    // ==========================================

    /// Start a sign-in attempt.
    pub async fn create_sign_in(&self, params: &CreateSignInParams) -> PosternResult<SignIn> {
        let envelope = self
            .api
            .create_sign_in(params)
            .await
            .map_err(|err| self.absorb_error(err))?;
        Ok(self.finish_sign_in(envelope))
    }

    /// Send the chosen first factor (e.g. deliver an email code).
    pub async fn prepare_first_factor(
        &self,
        sign_in_id: &str,
        params: &PrepareFirstFactorParams,
    ) -> PosternResult<SignIn> {
        let envelope = self
            .api
            .prepare_first_factor(sign_in_id, params)
            .await
            .map_err(|err| self.absorb_error(err))?;
        Ok(self.finish_sign_in(envelope))
    }

    /// Submit first factor proof (code, password, passkey response).
    pub async fn attempt_first_factor(
        &self,
        sign_in_id: &str,
        params: &AttemptFirstFactorParams,
    ) -> PosternResult<SignIn> {
        let envelope = self
            .api
            .attempt_first_factor(sign_in_id, params)
            .await
            .map_err(|err| self.absorb_error(err))?;
        Ok(self.finish_sign_in(envelope))
    }

    pub async fn prepare_second_factor(
        &self,
        sign_in_id: &str,
        params: &PrepareSecondFactorParams,
    ) -> PosternResult<SignIn> {
        let envelope = self
            .api
            .prepare_second_factor(sign_in_id, params)
            .await
            .map_err(|err| self.absorb_error(err))?;
        Ok(self.finish_sign_in(envelope))
    }

    pub async fn attempt_second_factor(
        &self,
        sign_in_id: &str,
        params: &AttemptSecondFactorParams,
    ) -> PosternResult<SignIn> {
        let envelope = self
            .api
            .attempt_second_factor(sign_in_id, params)
            .await
            .map_err(|err| self.absorb_error(err))?;
        Ok(self.finish_sign_in(envelope))
    }

    // ==========================================
    // Sign-up
    // ==========================================

    /// Start a registration attempt.
    pub async fn create_sign_up(&self, params: &SignUpParams) -> PosternResult<SignUp> {
        let envelope = self
            .api
            .create_sign_up(params)
            .await
            .map_err(|err| self.absorb_error(err))?;
        Ok(self.finish_sign_up(envelope))
    }

    /// Fill in more fields on an in-progress registration.
    pub async fn update_sign_up(
        &self,
        sign_up_id: &str,
        params: &SignUpParams,
    ) -> PosternResult<SignUp> {
        let envelope = self
            .api
            .update_sign_up(sign_up_id, params)
            .await
            .map_err(|err| self.absorb_error(err))?;
        Ok(self.finish_sign_up(envelope))
    }

    pub async fn prepare_sign_up_verification(
        &self,
        sign_up_id: &str,
        params: &PrepareSignUpVerificationParams,
    ) -> PosternResult<SignUp> {
        let envelope = self
            .api
            .prepare_sign_up_verification(sign_up_id, params)
            .await
            .map_err(|err| self.absorb_error(err))?;
        Ok(self.finish_sign_up(envelope))
    }

    pub async fn attempt_sign_up_verification(
        &self,
        sign_up_id: &str,
        params: &AttemptSignUpVerificationParams,
    ) -> PosternResult<SignUp> {
        let envelope = self
            .api
            .attempt_sign_up_verification(sign_up_id, params)
            .await
            .map_err(|err| self.absorb_error(err))?;
        Ok(self.finish_sign_up(envelope))
    }

    // ==========================================
    // Sessions
    // ==========================================

    /// Make one of the client's active sessions the active one, optionally
    /// switching its active organization at the same time.
    pub async fn set_active_session(
        &self,
        session_id: &str,
        organization_id: Option<&str>,
    ) -> PosternResult<()> {
        let client = self.state.client().ok_or(PosternError::ClientMissing)?;
        match client.session_by_id(session_id) {
            Some(session) if session.is_active() => {}
            _ => return Err(PosternError::SessionNotFound(session_id.to_string())),
        }

        let params = TouchSessionParams {
            active_organization_id: organization_id.map(str::to_string),
        };
        let envelope = self
            .api
            .touch_session(session_id, &params)
            .await
            .map_err(|err| self.absorb_error(err))?;
        if let Some(client) = envelope.client {
            self.adopt_client(client);
        }

        // The piggybacked client normally records the switch; cover for a
        // response that omitted it.
        if let Some(mut client) = self.state.client() {
            if client.last_active_session_id.as_deref() != Some(session_id) {
                client.last_active_session_id = Some(session_id.to_string());
                self.adopt_client(client);
            }
        }
        Ok(())
    }

    /// End one session, or the whole device client.
    ///
    /// `None` signs out everything: the server-side client is deleted,
    /// local state and caches are cleared, and companions are told to clear
    /// theirs.
    pub async fn sign_out(&self, session_id: Option<&str>) -> PosternResult<()> {
        match session_id {
            Some(id) => {
                let envelope = self
                    .api
                    .remove_session(id)
                    .await
                    .map_err(|err| self.absorb_error(err))?;
                self.state.remove_token(id);
                if let Some(client) = envelope.client {
                    self.adopt_client(client);
                }
                debug!(session_id = %id, "Session removed");
                Ok(())
            }
            None => {
                let envelope = self
                    .api
                    .delete_client()
                    .await
                    .map_err(|err| self.absorb_error(err))?;
                // Adopt the emptied client when the server returned one, but
                // do not push it: the sentinel below is the sign-out signal.
                match envelope.client {
                    Some(client) => {
                        self.state.clear_tokens();
                        self.cache.save_client(&client);
                        self.state.set_client(client);
                    }
                    None => {
                        self.cache.clear_client();
                        self.state.clear_client();
                    }
                }
                self.announce_signed_out();
                debug!("Signed out of all sessions");
                Ok(())
            }
        }
    }

    /// A decoded, non-stale token for the active session.
    ///
    /// Served from cache while the cached token sits outside the staleness
    /// window; minted on demand otherwise.
    pub async fn active_session_token(&self) -> PosternResult<SessionToken> {
        let client = self.state.client().ok_or(PosternError::ClientMissing)?;
        let session_id = client
            .last_active_session()
            .map(|session| session.id.clone())
            .ok_or(PosternError::NoActiveSession)?;

        let leeway = chrono::Duration::milliseconds(self.config.token_leeway.as_millis() as i64);
        if let Some(token) = self.state.session_token(&session_id) {
            if !token.is_expired(Utc::now(), leeway) {
                return Ok(token);
            }
        }

        let minted = self
            .api
            .mint_session_token(&session_id)
            .await
            .map_err(|err| self.absorb_error(err))?;
        let token = SessionToken::decode(&minted.jwt)?;
        self.state.store_token(&session_id, token.clone());
        Ok(token)
    }

    // ==========================================
    // Internals
    // ==========================================

    /// Adopt the envelope's client, then finish bookkeeping for a sign-in.
    fn finish_sign_in(&self, envelope: Envelope<SignIn>) -> SignIn {
        let Envelope { response, client } = envelope;
        if let Some(client) = client {
            self.adopt_client(client);
        }
        if response.is_complete() {
            self.promote_created_session(response.created_session_id.as_deref());
        }
        response
    }

    fn finish_sign_up(&self, envelope: Envelope<SignUp>) -> SignUp {
        let Envelope { response, client } = envelope;
        if let Some(client) = client {
            self.adopt_client(client);
        }
        if response.is_complete() {
            self.promote_created_session(response.created_session_id.as_deref());
        }
        response
    }

    /// Mark the session minted by a completed attempt as the active one
    /// and drop the settled attempt objects from the client.
    ///
    /// The id is validated against the adopted client first. A miss means
    /// the piggybacked client did not carry the new session; the held copy
    /// stays untouched since the server owns session membership.
    fn promote_created_session(&self, created_session_id: Option<&str>) {
        let Some(session_id) = created_session_id else {
            warn!("Completed attempt did not name a created session");
            return;
        };
        let Some(mut client) = self.state.client() else {
            warn!(session_id = %session_id, "Completed attempt arrived with no client loaded");
            return;
        };
        if client.session_by_id(session_id).is_none() {
            warn!(session_id = %session_id, "Created session is missing from the client, not promoting");
            return;
        }
        let already_active = client.last_active_session_id.as_deref() == Some(session_id);
        if already_active && client.sign_in.is_none() && client.sign_up.is_none() {
            return;
        }
        client.last_active_session_id = Some(session_id.to_string());
        client.sign_in = None;
        client.sign_up = None;
        self.adopt_client(client);
    }

    /// Apply the error side-channel before surfacing the failure.
    fn absorb_error(&self, mut err: ApiError) -> PosternError {
        if let Some(client) = err.take_client() {
            self.adopt_client(client);
        }
        PosternError::Api(err)
    }

    /// Tell the companion to clear its state, when sync is enabled.
    fn announce_signed_out(&self) {
        let sync = self.sync.lock().expect("lock poisoned").clone();
        if let Some(sync) = sync {
            if let Err(err) = sync.announce_signed_out() {
                debug!(error = %err, "Sign-out announcement skipped");
            }
        }
    }
}
