//! Session token decoding.
//!
//! Splits a three-part signed token into header, claims, and signature and
//! decodes the first two. Signature verification is deliberately absent:
//! tokens are minted and validated by the remote authority, and the client
//! only inspects claims (expiry, issuer, subject) to schedule refreshes.

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Errors that can occur while decoding a token.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Malformed token: expected 3 dot-separated segments, found {0}")]
    MalformedStructure(usize),

    #[error("Segment is not valid base64url: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Segment is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type TokenResult<T> = Result<T, TokenError>;

/// Decoded token header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    pub alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

/// Registered claims the SDK consumes, plus everything else verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Session id the token was minted for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    /// Authorized party (the application origin).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A decoded (not verified) session token.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionToken {
    raw: String,
    pub header: TokenHeader,
    pub claims: TokenClaims,
    pub signature: Vec<u8>,
}

impl SessionToken {
    /// Decode `header.claims.signature`. The signature segment is kept as
    /// raw bytes and never checked.
    pub fn decode(raw: &str) -> TokenResult<Self> {
        let segments: Vec<&str> = raw.split('.').collect();
        if segments.len() != 3 {
            return Err(TokenError::MalformedStructure(segments.len()));
        }

        let header_bytes = general_purpose::URL_SAFE_NO_PAD.decode(segments[0])?;
        let claims_bytes = general_purpose::URL_SAFE_NO_PAD.decode(segments[1])?;
        let signature = general_purpose::URL_SAFE_NO_PAD.decode(segments[2])?;

        let header: TokenHeader = serde_json::from_slice(&header_bytes)?;
        let claims: TokenClaims = serde_json::from_slice(&claims_bytes)?;

        Ok(Self {
            raw: raw.to_string(),
            header,
            claims,
            signature,
        })
    }

    /// The exact string this token was decoded from.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.claims
            .exp
            .and_then(|exp| Utc.timestamp_opt(exp, 0).single())
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.claims
            .iat
            .and_then(|iat| Utc.timestamp_opt(iat, 0).single())
    }

    pub fn issuer(&self) -> Option<&str> {
        self.claims.iss.as_deref()
    }

    pub fn subject(&self) -> Option<&str> {
        self.claims.sub.as_deref()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.claims.sid.as_deref()
    }

    /// Expired at `now`, with `leeway` subtracted from the deadline so a
    /// token about to lapse counts as expired. A token without an `exp`
    /// claim is treated as expired.
    pub fn is_expired(&self, now: DateTime<Utc>, leeway: Duration) -> bool {
        match self.expires_at() {
            Some(expires_at) => expires_at - leeway <= now,
            None => true,
        }
    }
}
