//! Transport error taxonomy.

use postern_resources::{Client, RemoteError};
use postern_storage::StoreError;

/// Errors produced by the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Response decoding failed: {0}")]
    Decode(#[from] serde_json::Error),

    /// Structured rejection from the authority. Carries the piggybacked
    /// client so callers can apply the side-channel even on failure.
    #[error("Request rejected ({status}): {}", summarize_errors(.errors))]
    Remote {
        status: u16,
        errors: Vec<RemoteError>,
        client: Option<Box<Client>>,
    },

    /// Non-JSON failure body; only a digest of it is retained.
    #[error("Unexpected response ({status}): {body_summary}")]
    Unexpected { status: u16, body_summary: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

pub type ApiResult<T> = Result<T, ApiError>;

fn summarize_errors(errors: &[RemoteError]) -> String {
    match errors.first() {
        Some(first) if errors.len() == 1 => first.to_string(),
        Some(first) => format!("{} (+{} more)", first, errors.len() - 1),
        None => "no error detail".to_string(),
    }
}

impl ApiError {
    /// Whether retrying the same request later could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Remote { status, .. } | Self::Unexpected { status, .. } => {
                *status == 429 || *status >= 500
            }
            Self::InvalidUrl(_) | Self::Decode(_) | Self::Storage(_) => false,
        }
    }

    /// First machine-readable rejection code, when one exists.
    pub fn remote_code(&self) -> Option<&str> {
        match self {
            Self::Remote { errors, .. } => errors.first().map(|e| e.code.as_str()),
            _ => None,
        }
    }

    /// Take the client piggybacked on a remote rejection, if any.
    pub fn take_client(&mut self) -> Option<Client> {
        match self {
            Self::Remote { client, .. } => client.take().map(|boxed| *boxed),
            _ => None,
        }
    }
}
