//! Sign-in attempts and the factor-selection policy.

use crate::{Client, Factor, Session, Strategy, Verification};
use serde::{Deserialize, Serialize};

/// One in-progress sign-in ceremony, tracked server-side.
///
/// Transient and single-use: every prepare/attempt call returns an updated
/// copy, and callers must always thread the most recently returned value
/// into the next call. The status field is published by the server; this
/// type never advances it locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignIn {
    pub id: String,
    pub status: SignInStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_first_factors: Option<Vec<Factor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_second_factors: Option<Vec<Factor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_factor_verification: Option<Verification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_factor_verification: Option<Verification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_session_id: Option<String>,
}

/// Server-published sign-in status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignInStatus {
    NeedsIdentifier,
    NeedsFirstFactor,
    NeedsSecondFactor,
    Complete,
    Abandoned,
    #[serde(other)]
    Unknown,
}

/// Which family of first factors to favor when several qualify.
///
/// Mirrors the environment's display configuration; chosen to minimize
/// extra user input, not mandated by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorPreference {
    Password,
    Otp,
}

impl Default for FactorPreference {
    fn default() -> Self {
        Self::Password
    }
}

/// First-factor priority when passwords are preferred.
const FIRST_FACTOR_PRIORITY: [Strategy; 4] = [
    Strategy::Passkey,
    Strategy::Password,
    Strategy::EmailCode,
    Strategy::PhoneCode,
];

/// Exact inverse, used when one-time codes are preferred.
const FIRST_FACTOR_PRIORITY_OTP: [Strategy; 4] = [
    Strategy::PhoneCode,
    Strategy::EmailCode,
    Strategy::Password,
    Strategy::Passkey,
];

const SECOND_FACTOR_PRIORITY: [Strategy; 3] =
    [Strategy::Totp, Strategy::PhoneCode, Strategy::BackupCode];

impl SignIn {
    pub fn is_complete(&self) -> bool {
        self.status == SignInStatus::Complete
    }

    /// Terminal attempts are discarded from the client once a session is
    /// promoted.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, SignInStatus::Complete | SignInStatus::Abandoned)
    }

    /// Pick the first factor to present.
    ///
    /// A factor whose `safe_identifier` matches the identifier the user
    /// already supplied wins outright; otherwise a fixed strategy priority
    /// applies (inverted when one-time codes are preferred). Deterministic
    /// for a given factor list and preference.
    pub fn starting_first_factor(&self, preference: FactorPreference) -> Option<&Factor> {
        let factors = self.supported_first_factors.as_deref()?;

        if let Some(identifier) = self.identifier.as_deref() {
            if let Some(matching) = factors
                .iter()
                .find(|factor| factor.safe_identifier.as_deref() == Some(identifier))
            {
                return Some(matching);
            }
        }

        let priority: &[Strategy] = match preference {
            FactorPreference::Password => &FIRST_FACTOR_PRIORITY,
            FactorPreference::Otp => &FIRST_FACTOR_PRIORITY_OTP,
        };
        Self::first_by_priority(factors, priority)
    }

    /// Pick the second factor to present: TOTP, then phone code, then
    /// backup code.
    pub fn starting_second_factor(&self) -> Option<&Factor> {
        let factors = self.supported_second_factors.as_deref()?;
        Self::first_by_priority(factors, &SECOND_FACTOR_PRIORITY)
    }

    fn first_by_priority<'a>(factors: &'a [Factor], priority: &[Strategy]) -> Option<&'a Factor> {
        priority
            .iter()
            .find_map(|wanted| factors.iter().find(|factor| &factor.strategy == wanted))
    }

    /// Resolve the session this completed attempt produced.
    ///
    /// The join key is the session id returned in the completed attempt, and
    /// it must be re-validated against the client's session list: the attempt
    /// can complete through a different provider than originally requested
    /// (account linking), so the id is looked up rather than trusted blindly.
    pub fn created_session<'a>(&self, client: &'a Client) -> Option<&'a Session> {
        self.created_session_id
            .as_deref()
            .and_then(|id| client.session_by_id(id))
    }
}
