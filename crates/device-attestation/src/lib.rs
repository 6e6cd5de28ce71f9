//! Hardware-backed device attestation.
//!
//! Proves to the authority that requests originate from a genuine app
//! install on real hardware. The platform-specific key machinery (App
//! Attest, Play Integrity) stays behind the [`PlatformAttestor`] trait;
//! this crate owns the protocol around it: fetch a challenge, bind a
//! hardware key to it, and persist the key id only once the server has
//! accepted the attestation.

mod attestor;
mod error;
mod service;

pub use attestor::PlatformAttestor;
pub use error::{AttestError, AttestResult};
pub use service::AttestationService;
