//! Environment: the remote authority's configuration snapshot.

use crate::{FactorPreference, Strategy};
use serde::{Deserialize, Serialize};

/// Read-mostly configuration published by the authority.
///
/// Replaced wholesale on fetch. The default value is the distinguishable
/// "never fetched" state; a cached copy is only trusted when non-empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    #[serde(default, rename = "auth_config")]
    pub auth: AuthConfig,
    #[serde(default, rename = "display_config")]
    pub display: DisplayConfig,
    #[serde(default, rename = "fraud_settings")]
    pub fraud: FraudSettings,
}

/// Authentication-related flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub single_session_mode: bool,
    #[serde(default)]
    pub enabled_first_factors: Vec<Strategy>,
}

/// Display configuration the SDK consults for policy (not rendering).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default)]
    pub application_name: String,
    #[serde(default)]
    pub preferred_sign_in_strategy: FactorPreference,
}

/// Fraud-prevention settings, including the attestation requirement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FraudSettings {
    #[serde(default)]
    pub device_attestation_mode: AttestationMode,
}

/// Whether and how strictly the authority requires device attestation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttestationMode {
    Disabled,
    Onboarding,
    Enforced,
    #[serde(other)]
    Unknown,
}

impl Default for AttestationMode {
    fn default() -> Self {
        Self::Disabled
    }
}

impl AttestationMode {
    pub fn requires_attestation(&self) -> bool {
        matches!(self, Self::Onboarding | Self::Enforced)
    }
}

impl Environment {
    /// True until a real snapshot has been fetched or restored.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
