//! Background device attestation driven by the fetched environment.
//!
//! Attestation never gates `load()`; these scenarios pin that down along
//! with the conditions under which the handshake runs at all.

use super::harness::*;
use crate::PlatformAttestor;
use device_attestation::AttestResult;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

struct StubAttestor;

impl PlatformAttestor for StubAttestor {
    fn is_supported(&self) -> bool {
        true
    }

    fn generate_key(&self) -> AttestResult<String> {
        Ok("key_stub".to_string())
    }

    fn attest_key(&self, _key_id: &str, digest: &[u8]) -> AttestResult<Vec<u8>> {
        Ok(digest.to_vec())
    }

    fn sign(&self, _key_id: &str, digest: &[u8]) -> AttestResult<Vec<u8>> {
        Ok(digest.to_vec())
    }
}

async fn mount_enforced_environment(harness: &TestHarness) {
    let mut environment = environment_json();
    environment["fraud_settings"]["device_attestation_mode"] = json!("enforced");
    Mock::given(method("GET"))
        .and(path("/v1/environment"))
        .respond_with(ResponseTemplate::new(200).set_body_json(environment))
        .mount(&harness.server)
        .await;
}

async fn mount_attestation_endpoints(harness: &TestHarness) {
    Mock::given(method("POST"))
        .and(path("/v1/client/device_attestation/challenges"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"challenge": "nonce_1"})))
        .mount(&harness.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/client/device_attestation/verify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": {}})))
        .mount(&harness.server)
        .await;
}

#[tokio::test]
async fn test_enforced_mode_attests_in_the_background() {
    let harness = TestHarness::new().await;
    mount_enforced_environment(&harness).await;
    harness
        .mount_client(client_json("client_1", vec![], None, 1_000))
        .await;
    mount_attestation_endpoints(&harness).await;
    harness
        .postern
        .enable_device_attestation(Arc::new(StubAttestor), "app.postern.demo");

    harness.postern.load().await.unwrap();
    assert!(harness.postern.phase().is_ready());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        harness.vault().attestation_key_id().unwrap(),
        Some("key_stub".to_string())
    );
}

#[tokio::test]
async fn test_load_succeeds_when_attestation_fails() {
    let harness = TestHarness::new().await;
    mount_enforced_environment(&harness).await;
    harness
        .mount_client(client_json("client_1", vec![], None, 1_000))
        .await;
    // No attestation endpoints mounted: the handshake 404s.
    harness
        .postern
        .enable_device_attestation(Arc::new(StubAttestor), "app.postern.demo");

    harness.postern.load().await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(harness.vault().attestation_key_id().unwrap(), None);
}

#[tokio::test]
async fn test_disabled_mode_never_asks_for_a_challenge() {
    let harness = TestHarness::new().await;
    harness.mount_signed_out_load().await;
    Mock::given(method("POST"))
        .and(path("/v1/client/device_attestation/challenges"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"challenge": "nonce_1"})))
        .expect(0)
        .mount(&harness.server)
        .await;
    harness
        .postern
        .enable_device_attestation(Arc::new(StubAttestor), "app.postern.demo");

    harness.postern.load().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn test_attested_device_does_not_reattest() {
    let harness = TestHarness::new().await;
    harness.vault().set_attestation_key_id("key_older").unwrap();
    mount_enforced_environment(&harness).await;
    harness
        .mount_client(client_json("client_1", vec![], None, 1_000))
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/client/device_attestation/challenges"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"challenge": "nonce_1"})))
        .expect(0)
        .mount(&harness.server)
        .await;
    harness
        .postern
        .enable_device_attestation(Arc::new(StubAttestor), "app.postern.demo");

    harness.postern.load().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(
        harness.vault().attestation_key_id().unwrap(),
        Some("key_older".to_string())
    );
}
