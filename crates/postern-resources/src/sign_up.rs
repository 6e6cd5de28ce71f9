//! Sign-up attempts.

use crate::{Client, Session, Verification};
use serde::{Deserialize, Serialize};

/// One in-progress registration ceremony, tracked server-side.
///
/// Like [`crate::SignIn`], every update/prepare/attempt call returns a fresh
/// copy that supersedes the one held before.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignUp {
    pub id: String,
    pub status: SignUpStatus,
    #[serde(default)]
    pub required_fields: Vec<String>,
    #[serde(default)]
    pub missing_fields: Vec<String>,
    #[serde(default)]
    pub unverified_fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "SignUpVerifications::is_empty")]
    pub verifications: SignUpVerifications,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_session_id: Option<String>,
}

/// Server-published sign-up status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignUpStatus {
    MissingRequirements,
    Complete,
    Abandoned,
    #[serde(other)]
    Unknown,
}

/// Per-channel verification slots on a sign-up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignUpVerifications {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<Verification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<Verification>,
}

impl SignUpVerifications {
    fn is_empty(&self) -> bool {
        self.email_address.is_none() && self.phone_number.is_none()
    }
}

impl SignUp {
    pub fn is_complete(&self) -> bool {
        self.status == SignUpStatus::Complete
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, SignUpStatus::Complete | SignUpStatus::Abandoned)
    }

    /// Fields still required but not yet supplied.
    pub fn is_missing(&self, field: &str) -> bool {
        self.missing_fields.iter().any(|name| name == field)
    }

    /// Fields supplied but not yet verified.
    pub fn needs_verification(&self, field: &str) -> bool {
        self.unverified_fields.iter().any(|name| name == field)
    }

    /// Resolve the session this completed attempt produced; same join and
    /// re-validation rule as for sign-in.
    pub fn created_session<'a>(&self, client: &'a Client) -> Option<&'a Session> {
        self.created_session_id
            .as_deref()
            .and_then(|id| client.session_by_id(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VerificationStatus;

    #[test]
    fn decodes_wire_sign_up() {
        let json = r#"{
            "id": "sua_1",
            "status": "missing_requirements",
            "required_fields": ["email_address", "password"],
            "missing_fields": ["password"],
            "unverified_fields": ["email_address"],
            "email_address": "ada@example.com",
            "verifications": {
                "email_address": {"status": "unverified", "strategy": "email_code"}
            }
        }"#;

        let sign_up: SignUp = serde_json::from_str(json).unwrap();
        assert_eq!(sign_up.status, SignUpStatus::MissingRequirements);
        assert!(sign_up.is_missing("password"));
        assert!(!sign_up.is_missing("email_address"));
        assert!(sign_up.needs_verification("email_address"));
        assert_eq!(
            sign_up
                .verifications
                .email_address
                .as_ref()
                .map(|v| v.status),
            Some(VerificationStatus::Unverified)
        );
    }

    #[test]
    fn terminal_statuses() {
        let json = r#"{"id": "sua_1", "status": "complete"}"#;
        let sign_up: SignUp = serde_json::from_str(json).unwrap();
        assert!(sign_up.is_complete());
        assert!(sign_up.is_terminal());

        let json = r#"{"id": "sua_1", "status": "abandoned"}"#;
        let sign_up: SignUp = serde_json::from_str(json).unwrap();
        assert!(!sign_up.is_complete());
        assert!(sign_up.is_terminal());
    }

    #[test]
    fn empty_verifications_are_omitted_when_encoding() {
        let json = r#"{"id": "sua_1", "status": "complete"}"#;
        let sign_up: SignUp = serde_json::from_str(json).unwrap();
        let encoded = serde_json::to_string(&sign_up).unwrap();
        assert!(!encoded.contains("verifications"));
    }
}
