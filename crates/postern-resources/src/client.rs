//! The client aggregate: root of a device's authentication state.

use crate::{Session, SessionStatus, SignIn, SignUp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Root aggregate for one device's authentication state.
///
/// Replaced wholesale on every successful remote fetch or attempt completion;
/// the SDK never patches individual fields of a held client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sign_in: Option<SignIn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sign_up: Option<SignUp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_active_session_id: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl Client {
    /// Sessions able to serve authenticated requests right now.
    ///
    /// Pending sessions (outstanding tasks) and all terminal statuses are
    /// excluded; only `active` qualifies.
    pub fn active_sessions(&self) -> Vec<&Session> {
        self.sessions
            .iter()
            .filter(|session| session.status == SessionStatus::Active)
            .collect()
    }

    pub fn session_by_id(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|session| session.id == id)
    }

    /// The session named by `last_active_session_id`, when both exist.
    pub fn last_active_session(&self) -> Option<&Session> {
        self.last_active_session_id
            .as_deref()
            .and_then(|id| self.session_by_id(id))
    }

    /// Signed in means at least one session can serve requests.
    pub fn is_signed_in(&self) -> bool {
        !self.active_sessions().is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
