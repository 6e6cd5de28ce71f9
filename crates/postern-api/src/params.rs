//! Form-encoded request parameters.
//!
//! Every struct here serializes with `skip_serializing_if` so absent fields
//! never reach the wire; the authority treats a present-but-empty field as a
//! supplied value.

use postern_resources::Strategy;
use serde::Serialize;

#[derive(Debug, Default, Clone, Serialize)]
pub struct CreateSignInParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Single-use invitation or recovery ticket.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket: Option<String>,
    /// Continue a transferable verification from a sign-up attempt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrepareFirstFactorParams {
    pub strategy: Strategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_address_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttemptFirstFactorParams {
    pub strategy: Strategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Platform credential payload for passkey strategies, passed through opaquely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key_credential: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrepareSecondFactorParams {
    pub strategy: Strategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttemptSecondFactorParams {
    pub strategy: Strategy,
    pub code: String,
}

/// Shared by sign-up create (POST) and update (PATCH).
#[derive(Debug, Default, Clone, Serialize)]
pub struct SignUpParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrepareSignUpVerificationParams {
    pub strategy: Strategy,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttemptSignUpVerificationParams {
    pub strategy: Strategy,
    pub code: String,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct TouchSessionParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_organization_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyAttestationParams {
    pub key_id: String,
    pub challenge: String,
    /// Base64-encoded platform attestation object.
    pub attestation: String,
    pub app_id: String,
    pub platform: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyAssertionParams {
    pub key_id: String,
    pub challenge: String,
    /// Base64-encoded signature over the assertion digest.
    pub assertion: String,
}
