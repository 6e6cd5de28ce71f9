//! Resource models for the Postern device SDK.
//!
//! This crate contains only data types, their serialization, and pure policy
//! functions over them: no I/O, no async, no transport. Every resource mirrors
//! the JSON shape published by the Postern frontend API and is replaced
//! wholesale whenever the server returns a newer copy.

mod client;
mod environment;
mod error;
mod factor;
mod session;
mod sign_in;
mod sign_up;
mod strategy;
mod verification;

pub use client::Client;
pub use environment::{AttestationMode, AuthConfig, DisplayConfig, Environment, FraudSettings};
pub use error::{ErrorMeta, RemoteError};
pub use factor::Factor;
pub use session::{Session, SessionStatus, SessionTask, User};
pub use sign_in::{FactorPreference, SignIn, SignInStatus};
pub use sign_up::{SignUp, SignUpStatus, SignUpVerifications};
pub use strategy::Strategy;
pub use verification::{Verification, VerificationStatus};
