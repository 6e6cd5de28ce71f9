//! Integration tests for the core SDK handle.
//!
//! Test organization:
//!
//! - `harness.rs`      - Mock server harness and wire fixtures
//! - `cold_start.rs`   - Cached snapshots and offline behavior
//! - `sign_in_flow.rs` - Sign-in ceremonies and side-channel application
//! - `sign_up_flow.rs` - Registration ceremonies
//! - `sessions.rs`     - Session activation, sign-out, session tokens
//! - `sync_pair.rs`    - Cross-device state sync over a paired channel
//! - `attestation.rs`  - Background attestation around `load()`

mod attestation;

// Re-exports for external test usage if needed
#[allow(unused_imports)]
pub use harness::TestHarness;
