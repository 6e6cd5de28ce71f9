//! # companion-sync: Cross-device authentication context sync
//!
//! Keeps the authentication context of a paired device duo (primary wearable
//! host and companion) converged. One side owns sign-in, the other mirrors it;
//! both keep working from local state while the pair is unreachable.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ChannelEvent    ┌─────────────────┐   merge policy   ┌──────────────┐
//! │ContextChannel│──────────────────▶│ SyncCoordinator │─────────────────▶│ LocalContext │
//! │ (transport)  │◀──────────────────│    (worker)     │                  │ (state owner)│
//! └──────────────┘   ContextUpdate   └────────┬────────┘                  └──────────────┘
//!                                             │
//!                                      ┌──────▼───────┐
//!                                      │CredentialVault│
//!                                      │ (device token,│
//!                                      │  synced flag) │
//!                                      └──────────────┘
//! ```
//!
//! ## Merge rules
//!
//! - **Device token**: until the pair has completed its first exchange, only
//!   the companion accepts an incoming token (the primary's own token is
//!   authoritative). Afterwards the last writer wins on both sides.
//! - **Client**: compared by `updated_at`. The primary accepts strictly newer
//!   copies; the companion also accepts an equal timestamp.
//! - **Signed-out sentinel**: applied unconditionally. It propagates a
//!   deliberate sign-out, so the timestamp comparison does not apply.
//! - **Environment**: always accepted.
//!
//! The merge policy in [`merge`] is pure and knows nothing about transport
//! reachability; connectivity only decides *when* updates flow, never *what*
//! is accepted.

mod channel;
mod coordinator;
mod error;
pub mod merge;
mod payload;

pub use channel::InMemoryChannel;
pub use coordinator::SyncCoordinator;
pub use error::{SyncError, SyncResult};
pub use payload::{
    ChannelEvent, ClientSlot, ContextChannel, ContextHandle, ContextReader, ContextUpdate,
    ContextWriter, DeviceRole, LocalContext,
};
