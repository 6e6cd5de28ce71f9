//! Error types for the core SDK surface.

use companion_sync::SyncError;
use device_attestation::AttestError;
use postern_api::ApiError;
use postern_storage::StoreError;
use session_token_codec::TokenError;
use thiserror::Error;

/// Errors surfaced by [`crate::Postern`] operations.
#[derive(Debug, Error)]
pub enum PosternError {
    /// The publishable key or another configuration value is malformed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An operation needs a client and none is loaded on this device.
    #[error("No client is loaded on this device")]
    ClientMissing,

    /// A token was requested while no session is active.
    #[error("No active session")]
    NoActiveSession,

    /// The named session is not an active session of the current client.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// A lifecycle input arrived in a phase that does not accept it.
    #[error("Invalid lifecycle transition: {0}")]
    InvalidStateTransition(String),

    /// [`crate::Postern::load`] failed before the SDK reached ready.
    #[error("SDK load failed: {0}")]
    Initialization(#[source] Box<PosternError>),

    /// The user dismissed an external credential flow without producing a
    /// credential. Hosts return this from their credential plumbing;
    /// callers treat it as a silent no-op rather than a failure.
    #[error("Credential flow cancelled")]
    FlowCancelled,

    /// The frontend API rejected or failed a request.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// A minted session token could not be decoded.
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// Secure storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// Companion sync failed.
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// Device attestation failed.
    #[error("Attestation error: {0}")]
    Attestation(#[from] AttestError),

    /// A URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl PosternError {
    /// True when retrying the same operation later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Api(err) => err.is_transient(),
            Self::Initialization(inner) => inner.is_transient(),
            _ => false,
        }
    }

    /// True when the user backed out of a credential flow.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::FlowCancelled)
    }
}

/// Result type for SDK operations.
pub type PosternResult<T> = Result<T, PosternError>;
