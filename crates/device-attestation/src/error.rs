use postern_api::ApiError;
use postern_storage::StoreError;
use thiserror::Error;

/// Errors surfaced by device attestation.
#[derive(Debug, Error)]
pub enum AttestError {
    /// This hardware cannot produce attested keys.
    #[error("device attestation is not supported on this hardware")]
    Unsupported,

    /// The platform refused to generate a hardware-backed key.
    #[error("attestation key generation failed: {0}")]
    KeyGeneration(String),

    /// Producing the attestation object failed.
    #[error("attestation failed: {0}")]
    Attestation(String),

    /// Signing with the attested key failed.
    #[error("assertion signing failed: {0}")]
    Signing(String),

    /// A round-trip to the authority failed.
    #[error("api error: {0}")]
    Api(#[from] ApiError),

    /// Reading or writing the credential vault failed.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

pub type AttestResult<T> = Result<T, AttestError>;

impl AttestError {
    /// Whether retrying later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            AttestError::Api(err) => err.is_transient(),
            AttestError::Unsupported => false,
            _ => false,
        }
    }
}
