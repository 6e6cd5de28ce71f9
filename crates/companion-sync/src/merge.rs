//! Pure merge policy for incoming context updates.
//!
//! Deliberately free of transport and storage concerns: reachability decides
//! when updates arrive, these rules decide what gets applied.

use crate::payload::DeviceRole;
use chrono::{DateTime, Utc};

/// Whether an incoming device token should replace the local one.
///
/// Until the pair completes its first exchange the primary's token is
/// authoritative: the companion accepts, the primary ignores. Afterwards
/// both sides converge on last-writer-wins.
pub fn should_accept_device_token(role: DeviceRole, already_synced: bool) -> bool {
    if !already_synced {
        return role == DeviceRole::Companion;
    }
    true
}

/// Whether an incoming client copy should replace the local one.
///
/// Compared by the server-assigned `updated_at`. The primary only yields to
/// strictly newer copies; the companion also accepts an equal timestamp so a
/// re-sent snapshot settles it onto the authoritative copy.
pub fn should_accept_client(
    role: DeviceRole,
    local_updated_at: Option<DateTime<Utc>>,
    incoming_updated_at: DateTime<Utc>,
) -> bool {
    let Some(local) = local_updated_at else {
        return true;
    };

    match role {
        DeviceRole::Primary => incoming_updated_at > local,
        DeviceRole::Companion => incoming_updated_at >= local,
    }
}
