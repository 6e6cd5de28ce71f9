//! REST transport to the Postern frontend API.
//!
//! This crate is the network boundary of the SDK: it builds requests,
//! carries the opaque device token in the `Authorization` header in both
//! directions, decodes the `{response, client}` envelope, and turns error
//! bodies into structured [`ApiError`] values. It never touches session
//! state; applying the envelope's client side-channel is the caller's job.

mod client;
mod envelope;
mod error;
mod params;

pub use client::ApiClient;
pub use envelope::{AttestationChallenge, Envelope, TokenResponse};
pub use error::{ApiError, ApiResult};
pub use params::{
    AttemptFirstFactorParams, AttemptSecondFactorParams, AttemptSignUpVerificationParams,
    CreateSignInParams, PrepareFirstFactorParams, PrepareSecondFactorParams,
    PrepareSignUpVerificationParams, SignUpParams, TouchSessionParams, VerifyAssertionParams,
    VerifyAttestationParams,
};
