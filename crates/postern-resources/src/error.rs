//! Structured error payloads returned by the remote authority.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One machine-readable rejection from the server.
///
/// `code` is stable and suitable for branching; `message` / `long_message`
/// are display text. `meta.param_name` names the offending form field when
/// the rejection is tied to a specific input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ErrorMeta>,
}

/// Field-level metadata attached to a [`RemoteError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param_name: Option<String>,
}

impl RemoteError {
    /// Field name this error refers to, when the server attached one.
    pub fn param_name(&self) -> Option<&str> {
        self.meta.as_ref().and_then(|m| m.param_name.as_deref())
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.param_name() {
            Some(param) => write!(f, "{} ({}, param: {})", self.message, self.code, param),
            None => write!(f, "{} ({})", self.message, self.code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_error_with_param_metadata() {
        let json = r#"{
            "code": "form_password_incorrect",
            "message": "Password is incorrect",
            "long_message": "Password is incorrect. Try again, or use another method.",
            "meta": {"param_name": "password"}
        }"#;

        let error: RemoteError = serde_json::from_str(json).unwrap();
        assert_eq!(error.code, "form_password_incorrect");
        assert_eq!(error.param_name(), Some("password"));
    }

    #[test]
    fn decodes_error_without_metadata() {
        let json = r#"{"code": "client_not_found", "message": "Client not found"}"#;

        let error: RemoteError = serde_json::from_str(json).unwrap();
        assert_eq!(error.param_name(), None);
        assert_eq!(error.to_string(), "Client not found (client_not_found)");
    }

    #[test]
    fn display_includes_param_when_present() {
        let error = RemoteError {
            code: "form_param_missing".to_string(),
            message: "Missing field".to_string(),
            long_message: None,
            meta: Some(ErrorMeta {
                param_name: Some("email_address".to_string()),
            }),
        };

        assert_eq!(
            error.to_string(),
            "Missing field (form_param_missing, param: email_address)"
        );
    }
}
