use crate::error::AttestResult;

/// Platform seam for hardware-backed attestation keys.
///
/// Implemented by the host with whatever the platform offers (App Attest on
/// Apple hardware, Play Integrity on Android). All methods are synchronous;
/// implementations that need to hop to a platform thread should block here.
pub trait PlatformAttestor: Send + Sync {
    /// Whether this hardware can produce attested keys.
    ///
    /// Simulators and older devices return false; the service then fails
    /// fast with [`AttestError::Unsupported`](crate::AttestError::Unsupported)
    /// instead of asking the platform for a key it cannot mint.
    fn is_supported(&self) -> bool;

    /// Generates a hardware-backed key pair and returns its identifier.
    fn generate_key(&self) -> AttestResult<String>;

    /// Produces an attestation object binding `key_id` to `digest`.
    fn attest_key(&self, key_id: &str, digest: &[u8]) -> AttestResult<Vec<u8>>;

    /// Signs `digest` with the previously attested key.
    fn sign(&self, key_id: &str, digest: &[u8]) -> AttestResult<Vec<u8>>;
}
