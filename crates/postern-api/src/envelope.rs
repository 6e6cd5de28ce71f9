//! Wire envelopes and small response payloads.

use postern_resources::{Client, RemoteError};
use serde::Deserialize;

/// The `{response, client}` envelope every mutating endpoint returns.
///
/// `client` is a side-channel copy of the full client aggregate, present on
/// success and on structured failure alike; callers apply it unconditionally.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub response: T,
    #[serde(default)]
    pub client: Option<Client>,
}

/// Error body shape: `{errors, client}`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub errors: Vec<RemoteError>,
    #[serde(default)]
    pub client: Option<Client>,
}

/// A freshly minted session token.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub jwt: String,
}

/// A single-use attestation challenge.
#[derive(Debug, Clone, Deserialize)]
pub struct AttestationChallenge {
    pub challenge: String,
}
