use postern_storage::StoreError;
use thiserror::Error;

/// Errors surfaced by context sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The paired device cannot be reached right now.
    #[error("paired device is unreachable")]
    Unreachable,

    /// The transport's event channel has shut down.
    #[error("context channel is closed")]
    Closed,

    /// A context payload could not be encoded or decoded.
    #[error("context payload encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Reading or writing the credential vault failed.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

pub type SyncResult<T> = Result<T, SyncError>;
