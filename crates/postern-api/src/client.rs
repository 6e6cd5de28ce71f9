//! HTTP client for the Postern frontend API.
//!
//! One method per endpoint, each performing a single round-trip. The opaque
//! device token is read from the vault before every request and replaced
//! from the response's `Authorization` header whenever the server rotates it.

use crate::envelope::ErrorBody;
use crate::error::{ApiError, ApiResult};
use crate::envelope::{AttestationChallenge, Envelope, TokenResponse};
use crate::params::{
    AttemptFirstFactorParams, AttemptSecondFactorParams, AttemptSignUpVerificationParams,
    CreateSignInParams, PrepareFirstFactorParams, PrepareSecondFactorParams,
    PrepareSignUpVerificationParams, SignUpParams, TouchSessionParams, VerifyAssertionParams,
    VerifyAttestationParams,
};
use postern_resources::{Client, Environment, Session, SignIn, SignUp};
use postern_storage::CredentialVault;
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use url::Url;

/// Pinned wire protocol version, sent with every request.
const API_VERSION: &str = "2025-04-10";

fn summarize_response_body(body: &str) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("len={},digest={:016x}", body.len(), hasher.finish())
}

/// Client for the Postern frontend API.
#[derive(Clone)]
pub struct ApiClient {
    http_client: reqwest::Client,
    base_url: Url,
    publishable_key: String,
    vault: Arc<CredentialVault>,
}

impl ApiClient {
    pub fn new(base_url: Url, publishable_key: impl Into<String>, vault: Arc<CredentialVault>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url,
            publishable_key: publishable_key.into(),
            vault,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build the versioned URL for an endpoint path.
    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    fn request(&self, method: Method, path: &str) -> ApiResult<RequestBuilder> {
        let mut builder = self
            .http_client
            .request(method, self.endpoint(path))
            .header("x-publishable-key", &self.publishable_key)
            .header("x-api-version", API_VERSION);

        if let Some(token) = self.vault.device_token()? {
            builder = builder.header(AUTHORIZATION, token);
        }

        Ok(builder)
    }

    /// Persist a rotated device token. Failure to persist is logged, not
    /// surfaced: the request itself already succeeded.
    fn capture_device_token(&self, response: &Response) {
        let Some(value) = response.headers().get(AUTHORIZATION) else {
            return;
        };
        match value.to_str() {
            Ok(token) if !token.is_empty() => {
                if let Err(e) = self.vault.set_device_token(token) {
                    tracing::warn!(error = %e, "Failed to persist rotated device token");
                }
            }
            _ => {}
        }
    }

    async fn handle_failure(&self, response: Response) -> ApiError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        match serde_json::from_str::<ErrorBody>(&body) {
            Ok(parsed) if !parsed.errors.is_empty() || parsed.client.is_some() => {
                tracing::debug!(
                    status = status,
                    code = parsed
                        .errors
                        .first()
                        .map(|e| e.code.as_str())
                        .unwrap_or("unknown"),
                    "Request rejected by the API"
                );
                ApiError::Remote {
                    status,
                    errors: parsed.errors,
                    client: parsed.client.map(Box::new),
                }
            }
            _ => {
                let body_summary = summarize_response_body(&body);
                tracing::error!(status = status, body_summary = %body_summary, "Unexpected API response");
                ApiError::Unexpected { status, body_summary }
            }
        }
    }

    async fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ApiResult<T> {
        let response = builder.send().await?;
        self.capture_device_token(&response);

        if !response.status().is_success() {
            return Err(self.handle_failure(response).await);
        }

        Ok(response.json::<T>().await?)
    }

    // ==========================================
    // Client
    // ==========================================

    pub async fn get_client(&self) -> ApiResult<Envelope<Client>> {
        tracing::debug!("Fetching client");
        self.execute(self.request(Method::GET, "client")?).await
    }

    /// Create the client on the authority, or replace it when one exists.
    pub async fn create_client(&self) -> ApiResult<Envelope<Client>> {
        tracing::debug!("Creating client");
        self.execute(self.request(Method::PUT, "client")?).await
    }

    /// Sign out everywhere: the server ends every session of this client.
    pub async fn delete_client(&self) -> ApiResult<Envelope<serde_json::Value>> {
        tracing::debug!("Deleting client");
        self.execute(self.request(Method::DELETE, "client")?).await
    }

    pub async fn get_environment(&self) -> ApiResult<Environment> {
        tracing::debug!("Fetching environment");
        self.execute(self.request(Method::GET, "environment")?).await
    }

    // ==========================================
    // Sessions
    // ==========================================

    pub async fn remove_session(&self, session_id: &str) -> ApiResult<Envelope<Session>> {
        tracing::debug!(session_id = %session_id, "Removing session");
        let path = format!("client/sessions/{}/remove", session_id);
        self.execute(self.request(Method::POST, &path)?).await
    }

    pub async fn touch_session(
        &self,
        session_id: &str,
        params: &TouchSessionParams,
    ) -> ApiResult<Envelope<Session>> {
        tracing::debug!(session_id = %session_id, "Touching session");
        let path = format!("client/sessions/{}/touch", session_id);
        self.execute(self.request(Method::POST, &path)?.form(params))
            .await
    }

    pub async fn mint_session_token(&self, session_id: &str) -> ApiResult<TokenResponse> {
        tracing::debug!(session_id = %session_id, "Minting session token");
        let path = format!("client/sessions/{}/tokens", session_id);
        self.execute(self.request(Method::POST, &path)?).await
    }

    // ==========================================
    // Sign-in
    // ==========================================

    pub async fn create_sign_in(&self, params: &CreateSignInParams) -> ApiResult<Envelope<SignIn>> {
        tracing::debug!("Creating sign-in attempt");
        self.execute(self.request(Method::POST, "client/sign_ins")?.form(params))
            .await
    }

    pub async fn prepare_first_factor(
        &self,
        sign_in_id: &str,
        params: &PrepareFirstFactorParams,
    ) -> ApiResult<Envelope<SignIn>> {
        tracing::debug!(sign_in_id = %sign_in_id, strategy = %params.strategy, "Preparing first factor");
        let path = format!("client/sign_ins/{}/prepare_first_factor", sign_in_id);
        self.execute(self.request(Method::POST, &path)?.form(params))
            .await
    }

    pub async fn attempt_first_factor(
        &self,
        sign_in_id: &str,
        params: &AttemptFirstFactorParams,
    ) -> ApiResult<Envelope<SignIn>> {
        tracing::debug!(sign_in_id = %sign_in_id, strategy = %params.strategy, "Attempting first factor");
        let path = format!("client/sign_ins/{}/attempt_first_factor", sign_in_id);
        self.execute(self.request(Method::POST, &path)?.form(params))
            .await
    }

    pub async fn prepare_second_factor(
        &self,
        sign_in_id: &str,
        params: &PrepareSecondFactorParams,
    ) -> ApiResult<Envelope<SignIn>> {
        tracing::debug!(sign_in_id = %sign_in_id, strategy = %params.strategy, "Preparing second factor");
        let path = format!("client/sign_ins/{}/prepare_second_factor", sign_in_id);
        self.execute(self.request(Method::POST, &path)?.form(params))
            .await
    }

    pub async fn attempt_second_factor(
        &self,
        sign_in_id: &str,
        params: &AttemptSecondFactorParams,
    ) -> ApiResult<Envelope<SignIn>> {
        tracing::debug!(sign_in_id = %sign_in_id, strategy = %params.strategy, "Attempting second factor");
        let path = format!("client/sign_ins/{}/attempt_second_factor", sign_in_id);
        self.execute(self.request(Method::POST, &path)?.form(params))
            .await
    }

    // ==========================================
    // Sign-up
    // ==========================================

    pub async fn create_sign_up(&self, params: &SignUpParams) -> ApiResult<Envelope<SignUp>> {
        tracing::debug!("Creating sign-up attempt");
        self.execute(self.request(Method::POST, "client/sign_ups")?.form(params))
            .await
    }

    pub async fn update_sign_up(
        &self,
        sign_up_id: &str,
        params: &SignUpParams,
    ) -> ApiResult<Envelope<SignUp>> {
        tracing::debug!(sign_up_id = %sign_up_id, "Updating sign-up attempt");
        let path = format!("client/sign_ups/{}", sign_up_id);
        self.execute(self.request(Method::PATCH, &path)?.form(params))
            .await
    }

    pub async fn prepare_sign_up_verification(
        &self,
        sign_up_id: &str,
        params: &PrepareSignUpVerificationParams,
    ) -> ApiResult<Envelope<SignUp>> {
        tracing::debug!(sign_up_id = %sign_up_id, strategy = %params.strategy, "Preparing sign-up verification");
        let path = format!("client/sign_ups/{}/prepare_verification", sign_up_id);
        self.execute(self.request(Method::POST, &path)?.form(params))
            .await
    }

    pub async fn attempt_sign_up_verification(
        &self,
        sign_up_id: &str,
        params: &AttemptSignUpVerificationParams,
    ) -> ApiResult<Envelope<SignUp>> {
        tracing::debug!(sign_up_id = %sign_up_id, strategy = %params.strategy, "Attempting sign-up verification");
        let path = format!("client/sign_ups/{}/attempt_verification", sign_up_id);
        self.execute(self.request(Method::POST, &path)?.form(params))
            .await
    }

    // ==========================================
    // Device attestation
    // ==========================================

    pub async fn attestation_challenge(&self) -> ApiResult<AttestationChallenge> {
        tracing::debug!("Fetching attestation challenge");
        self.execute(self.request(Method::POST, "client/device_attestation/challenges")?)
            .await
    }

    pub async fn verify_attestation(
        &self,
        params: &VerifyAttestationParams,
    ) -> ApiResult<Envelope<serde_json::Value>> {
        tracing::debug!(key_id = %params.key_id, "Verifying device attestation");
        self.execute(
            self.request(Method::POST, "client/device_attestation/verify")?
                .form(params),
        )
        .await
    }

    pub async fn verify_client(
        &self,
        params: &VerifyAssertionParams,
    ) -> ApiResult<Envelope<serde_json::Value>> {
        tracing::debug!(key_id = %params.key_id, "Verifying client assertion");
        self.execute(self.request(Method::POST, "client/verify")?.form(params))
            .await
    }
}
