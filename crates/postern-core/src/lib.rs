//! Core of the Postern device SDK.
//!
//! This crate ties the workspace together behind one handle:
//! - Lifecycle management with an explicit FSM (construct, load,
//!   foreground/background, shutdown)
//! - Cached cold starts: identity is visible before the first byte of
//!   network I/O completes
//! - Server-driven sign-in and sign-up flows with envelope side-channel
//!   application
//! - Session activation, sign-out, and on-demand session tokens
//! - Background token refresh, companion sync, and device attestation

mod cache;
mod config;
mod error;
mod flows;
mod lifecycle;
mod orchestrator;
mod refresh;
mod state;

#[cfg(test)]
mod tests;

pub use config::{PosternConfig, DEFAULT_REFRESH_INTERVAL, DEFAULT_TOKEN_LEEWAY};
pub use error::{PosternError, PosternResult};
pub use lifecycle::{SdkMachine, SdkMachineInput, SdkMachineState, SdkPhase};
pub use orchestrator::Postern;
pub use state::{StateChangeCallback, StateChangedPayload};

// The building blocks hosts interact with directly.
pub use companion_sync::{ContextChannel, DeviceRole, InMemoryChannel};
pub use device_attestation::PlatformAttestor;
pub use postern_api::{
    AttemptFirstFactorParams, AttemptSecondFactorParams, AttemptSignUpVerificationParams,
    CreateSignInParams, PrepareFirstFactorParams, PrepareSecondFactorParams,
    PrepareSignUpVerificationParams, SignUpParams,
};
pub use postern_resources::{
    Client, Environment, FactorPreference, Session, SignIn, SignUp, Strategy,
};
pub use session_token_codec::SessionToken;
