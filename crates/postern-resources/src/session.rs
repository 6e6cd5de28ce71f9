//! Sessions: one authenticated device/browser grant each.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One authenticated grant held by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub status: SessionStatus,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_active_at: DateTime<Utc>,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub expire_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub abandon_at: Option<DateTime<Utc>>,
    /// Outstanding work (e.g. incomplete onboarding) keeping the session pending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<SessionTask>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

/// Server-published session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Ended,
    Expired,
    Removed,
    Replaced,
    Pending,
    #[serde(other)]
    Unknown,
}

/// One pending-task descriptor on a pending session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTask {
    pub key: String,
}

/// The user a session belongs to. Only the fields the SDK needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Session {
    /// A pending session has outstanding tasks and cannot serve requests yet.
    pub fn is_pending(&self) -> bool {
        self.status == SessionStatus::Pending
    }

    /// Usable as the basis for authenticated requests.
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn pending_tasks(&self) -> &[SessionTask] {
        self.tasks.as_deref().unwrap_or_default()
    }
}
