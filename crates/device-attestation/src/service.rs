//! Attestation protocol against the authority.

use crate::attestor::PlatformAttestor;
use crate::error::{AttestError, AttestResult};
use base64::Engine;
use postern_api::{ApiClient, ApiError, VerifyAssertionParams, VerifyAttestationParams};
use postern_storage::CredentialVault;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Base64 encoding engine for attestation objects and signatures.
const BASE64: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

fn platform_name() -> &'static str {
    if cfg!(target_os = "ios") {
        "ios"
    } else if cfg!(target_os = "macos") {
        "macos"
    } else if cfg!(target_os = "android") {
        "android"
    } else {
        "unknown"
    }
}

/// Runs the attestation and assertion flows.
///
/// The attested key id is persisted in the vault only after the server has
/// accepted the attestation, so a crash mid-flow re-attests cleanly instead
/// of leaving a key the authority never saw.
pub struct AttestationService {
    api: ApiClient,
    vault: Arc<CredentialVault>,
    attestor: Arc<dyn PlatformAttestor>,
    app_id: String,
}

impl AttestationService {
    pub fn new(
        api: ApiClient,
        vault: Arc<CredentialVault>,
        attestor: Arc<dyn PlatformAttestor>,
        app_id: impl Into<String>,
    ) -> Self {
        Self {
            api,
            vault,
            attestor,
            app_id: app_id.into(),
        }
    }

    /// Whether this device already holds a server-accepted attested key.
    pub fn has_key(&self) -> AttestResult<bool> {
        Ok(self.vault.attestation_key_id()?.is_some())
    }

    /// One-time attestation: binds a fresh hardware key to a server
    /// challenge and registers it with the authority.
    pub async fn perform_device_attestation(&self) -> AttestResult<()> {
        if !self.attestor.is_supported() {
            return Err(AttestError::Unsupported);
        }

        let challenge = self.api.attestation_challenge().await?.challenge;
        let key_id = self.attestor.generate_key()?;
        let digest = Sha256::digest(challenge.as_bytes());
        let attestation = self.attestor.attest_key(&key_id, digest.as_slice())?;

        self.api
            .verify_attestation(&VerifyAttestationParams {
                key_id: key_id.clone(),
                challenge,
                attestation: BASE64.encode(attestation),
                app_id: self.app_id.clone(),
                platform: platform_name().to_string(),
            })
            .await?;

        self.vault.set_attestation_key_id(&key_id)?;
        info!(key_id = %key_id, "Device attestation completed");
        Ok(())
    }

    /// Steady-state assertion: proves possession of the attested key by
    /// signing a fresh challenge bound to the client.
    ///
    /// Runs the full attestation first when no key exists yet.
    pub async fn perform_assertion(&self, client_id: &str) -> AttestResult<()> {
        if !self.attestor.is_supported() {
            return Err(AttestError::Unsupported);
        }

        let key_id = match self.vault.attestation_key_id()? {
            Some(key_id) => key_id,
            None => {
                debug!("No attested key yet, running attestation first");
                self.perform_device_attestation().await?;
                self.vault.attestation_key_id()?.ok_or_else(|| {
                    AttestError::Attestation("attested key id missing after attestation".to_string())
                })?
            }
        };

        let challenge = self.api.attestation_challenge().await?.challenge;
        let client_data = serde_json::json!({
            "challenge": challenge,
            "client_id": client_id,
        });
        let digest = Sha256::digest(client_data.to_string().as_bytes());
        let assertion = self.attestor.sign(&key_id, digest.as_slice())?;

        let params = VerifyAssertionParams {
            key_id,
            challenge,
            assertion: BASE64.encode(assertion),
        };
        match self.api.verify_client(&params).await {
            Ok(_) => {
                debug!("Client assertion verified");
                Ok(())
            }
            Err(err) => {
                // A rejected assertion usually means the key is no longer
                // registered; drop it so the next attempt re-attests.
                if matches!(err, ApiError::Remote { .. }) {
                    warn!(error = %err, "Assertion rejected, clearing attested key");
                    self.vault.clear_attestation_key_id()?;
                }
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use postern_storage::MemoryStore;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use url::Url;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // =========================================================================
    // Mock attestor
    // =========================================================================

    struct FakeAttestor {
        supported: bool,
        keys_generated: AtomicUsize,
        signatures: AtomicUsize,
    }

    impl FakeAttestor {
        fn new(supported: bool) -> Self {
            Self {
                supported,
                keys_generated: AtomicUsize::new(0),
                signatures: AtomicUsize::new(0),
            }
        }
    }

    impl PlatformAttestor for FakeAttestor {
        fn is_supported(&self) -> bool {
            self.supported
        }

        fn generate_key(&self) -> AttestResult<String> {
            self.keys_generated.fetch_add(1, Ordering::SeqCst);
            Ok("key_abc".to_string())
        }

        fn attest_key(&self, _key_id: &str, digest: &[u8]) -> AttestResult<Vec<u8>> {
            Ok([b"att:".as_slice(), digest].concat())
        }

        fn sign(&self, _key_id: &str, digest: &[u8]) -> AttestResult<Vec<u8>> {
            self.signatures.fetch_add(1, Ordering::SeqCst);
            Ok([b"sig:".as_slice(), digest].concat())
        }
    }

    // =========================================================================
    // Fixtures
    // =========================================================================

    fn service(base: &str, attestor: Arc<FakeAttestor>) -> (AttestationService, Arc<CredentialVault>) {
        let vault = Arc::new(CredentialVault::new(Arc::new(MemoryStore::new())));
        let api = ApiClient::new(Url::parse(base).unwrap(), "pk_test_key", vault.clone());
        (
            AttestationService::new(api, vault.clone(), attestor, "app.postern.demo"),
            vault,
        )
    }

    async fn mount_challenge(server: &MockServer, challenge: &str) {
        Mock::given(method("POST"))
            .and(path("/v1/client/device_attestation/challenges"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"challenge": challenge})),
            )
            .mount(server)
            .await;
    }

    // =========================================================================
    // Attestation
    // =========================================================================

    #[tokio::test]
    async fn attestation_persists_key_only_after_server_accepts() {
        let server = MockServer::start().await;
        mount_challenge(&server, "nonce_1").await;
        Mock::given(method("POST"))
            .and(path("/v1/client/device_attestation/verify"))
            .and(body_string_contains("key_id=key_abc"))
            .and(body_string_contains("challenge=nonce_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": {}})))
            .mount(&server)
            .await;

        let attestor = Arc::new(FakeAttestor::new(true));
        let (service, vault) = service(&server.uri(), attestor.clone());

        service.perform_device_attestation().await.unwrap();

        assert_eq!(
            vault.attestation_key_id().unwrap(),
            Some("key_abc".to_string())
        );
        assert_eq!(attestor.keys_generated.load(Ordering::SeqCst), 1);
        assert!(service.has_key().unwrap());
    }

    #[tokio::test]
    async fn rejected_attestation_leaves_no_key_behind() {
        let server = MockServer::start().await;
        mount_challenge(&server, "nonce_1").await;
        Mock::given(method("POST"))
            .and(path("/v1/client/device_attestation/verify"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "errors": [{"code": "attestation_invalid", "message": "Attestation rejected"}]
            })))
            .mount(&server)
            .await;

        let (service, vault) = service(&server.uri(), Arc::new(FakeAttestor::new(true)));

        let err = service.perform_device_attestation().await.unwrap_err();
        assert!(matches!(err, AttestError::Api(ApiError::Remote { .. })));
        assert_eq!(vault.attestation_key_id().unwrap(), None);
    }

    #[tokio::test]
    async fn unsupported_hardware_fails_fast() {
        let server = MockServer::start().await;
        let (service, _vault) = service(&server.uri(), Arc::new(FakeAttestor::new(false)));

        let err = service.perform_device_attestation().await.unwrap_err();
        assert!(matches!(err, AttestError::Unsupported));

        let err = service.perform_assertion("client_1").await.unwrap_err();
        assert!(matches!(err, AttestError::Unsupported));
    }

    // =========================================================================
    // Assertion
    // =========================================================================

    #[tokio::test]
    async fn assertion_attests_first_when_no_key_exists() {
        let server = MockServer::start().await;
        mount_challenge(&server, "nonce_n").await;
        Mock::given(method("POST"))
            .and(path("/v1/client/device_attestation/verify"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": {}})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/client/verify"))
            .and(body_string_contains("key_id=key_abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": {}})))
            .mount(&server)
            .await;

        let attestor = Arc::new(FakeAttestor::new(true));
        let (service, vault) = service(&server.uri(), attestor.clone());

        service.perform_assertion("client_1").await.unwrap();

        assert_eq!(attestor.keys_generated.load(Ordering::SeqCst), 1);
        assert_eq!(attestor.signatures.load(Ordering::SeqCst), 1);
        assert_eq!(
            vault.attestation_key_id().unwrap(),
            Some("key_abc".to_string())
        );
    }

    #[tokio::test]
    async fn assertion_reuses_existing_key() {
        let server = MockServer::start().await;
        mount_challenge(&server, "nonce_n").await;
        Mock::given(method("POST"))
            .and(path("/v1/client/verify"))
            .and(body_string_contains("key_id=key_existing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": {}})))
            .mount(&server)
            .await;

        let attestor = Arc::new(FakeAttestor::new(true));
        let (service, vault) = service(&server.uri(), attestor.clone());
        vault.set_attestation_key_id("key_existing").unwrap();

        service.perform_assertion("client_1").await.unwrap();

        assert_eq!(attestor.keys_generated.load(Ordering::SeqCst), 0);
        assert_eq!(attestor.signatures.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rejected_assertion_clears_the_stale_key() {
        let server = MockServer::start().await;
        mount_challenge(&server, "nonce_n").await;
        Mock::given(method("POST"))
            .and(path("/v1/client/verify"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "errors": [{"code": "attestation_key_unknown", "message": "Unknown key"}]
            })))
            .mount(&server)
            .await;

        let (service, vault) = service(&server.uri(), Arc::new(FakeAttestor::new(true)));
        vault.set_attestation_key_id("key_stale").unwrap();

        let err = service.perform_assertion("client_1").await.unwrap_err();
        assert!(matches!(err, AttestError::Api(ApiError::Remote { .. })));
        assert_eq!(vault.attestation_key_id().unwrap(), None);
    }

    #[test]
    fn platform_name_is_known() {
        assert!(!platform_name().is_empty());
    }
}
