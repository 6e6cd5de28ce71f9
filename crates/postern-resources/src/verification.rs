//! Verification state for a single factor.

use crate::{RemoteError, Strategy};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of preparing or attempting one [`crate::Factor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    pub status: VerificationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub expire_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RemoteError>,
}

/// Server-published verification status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Unverified,
    Verified,
    Transferable,
    Failed,
    Expired,
    #[serde(other)]
    Unknown,
}

impl Verification {
    pub fn is_verified(&self) -> bool {
        self.status == VerificationStatus::Verified
    }

    /// Expired either by status or by a past `expire_at`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        if self.status == VerificationStatus::Expired {
            return true;
        }
        matches!(self.expire_at, Some(at) if at <= now)
    }
}
