//! SDK configuration and publishable key handling.
//!
//! The publishable key doubles as the address of the frontend API: its
//! payload is the base64 of the API host followed by a `$` terminator.
//! An explicit `api_url` override wins over the embedded origin, which is
//! how tests and self-hosted deployments point the SDK elsewhere.

use crate::error::{PosternError, PosternResult};
use base64::Engine;
use companion_sync::DeviceRole;
use std::time::Duration;
use url::Url;

const BASE64: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

const TEST_PREFIX: &str = "pk_test_";
const LIVE_PREFIX: &str = "pk_live_";

/// Default interval between background token refreshes.
///
/// Session tokens live for sixty seconds; refreshing at fifty keeps a valid
/// token cached without hammering the mint endpoint.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(50);

/// Tokens expiring within this window are treated as already stale.
pub const DEFAULT_TOKEN_LEEWAY: Duration = Duration::from_secs(10);

/// Static configuration for a [`crate::Postern`] instance.
#[derive(Debug, Clone)]
pub struct PosternConfig {
    /// Publishable key issued by the authority (`pk_test_*` or `pk_live_*`).
    pub publishable_key: String,
    /// Explicit frontend API origin, overriding the one embedded in the key.
    pub api_url: Option<Url>,
    /// Role this device plays in companion sync.
    pub device_role: DeviceRole,
    /// Interval between background token refreshes.
    pub refresh_interval: Duration,
    /// Staleness window applied when deciding whether a cached token is
    /// still servable.
    pub token_leeway: Duration,
}

impl PosternConfig {
    pub fn new(publishable_key: impl Into<String>) -> Self {
        Self {
            publishable_key: publishable_key.into(),
            api_url: None,
            device_role: DeviceRole::Primary,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            token_leeway: DEFAULT_TOKEN_LEEWAY,
        }
    }

    pub fn with_api_url(mut self, url: Url) -> Self {
        self.api_url = Some(url);
        self
    }

    pub fn with_device_role(mut self, role: DeviceRole) -> Self {
        self.device_role = role;
        self
    }

    /// Resolve the frontend API origin.
    ///
    /// The publishable key is validated in all cases; the explicit
    /// `api_url` then wins over the origin it encodes.
    pub fn api_origin(&self) -> PosternResult<Url> {
        let derived = decode_publishable_key(&self.publishable_key)?;
        Ok(self.api_url.clone().unwrap_or(derived))
    }

    /// True for `pk_live_` keys.
    pub fn is_live(&self) -> bool {
        self.publishable_key.starts_with(LIVE_PREFIX)
    }
}

/// Decode the API origin embedded in a publishable key.
fn decode_publishable_key(key: &str) -> PosternResult<Url> {
    let encoded = key
        .strip_prefix(TEST_PREFIX)
        .or_else(|| key.strip_prefix(LIVE_PREFIX))
        .ok_or_else(|| {
            PosternError::Configuration(
                "Publishable key must start with pk_test_ or pk_live_".to_string(),
            )
        })?;

    let decoded = BASE64.decode(encoded).map_err(|err| {
        PosternError::Configuration(format!("Publishable key payload is not base64: {}", err))
    })?;
    let host = String::from_utf8(decoded).map_err(|_| {
        PosternError::Configuration("Publishable key payload is not UTF-8".to_string())
    })?;
    let host = host.strip_suffix('$').ok_or_else(|| {
        PosternError::Configuration("Publishable key payload is missing its terminator".to_string())
    })?;
    if host.is_empty() {
        return Err(PosternError::Configuration(
            "Publishable key encodes an empty host".to_string(),
        ));
    }

    Ok(Url::parse(&format!("https://{}", host))?)
}
