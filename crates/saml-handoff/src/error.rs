//! SAML handoff error types

use thiserror::Error;

/// Result type for SAML handoff operations
pub type SamlResult<T> = Result<T, SamlError>;

/// Errors that are fatal for a single exchange.
///
/// An absent or malformed inbound request is deliberately *not* represented
/// here: the request extractor resolves it to `None` so that unsolicited
/// (IdP-initiated) flows remain a normal input class.
#[derive(Debug, Error)]
pub enum SamlError {
    /// No registered service definition found for the binding's id
    #[error("Unregistered service: {0}")]
    UnregisteredService(String),

    /// The registered username policy could not resolve an identifier
    #[error("Username resolution failed for service: {0}")]
    UsernameResolutionFailed(String),

    /// Key material could not be loaded or derived
    #[error("Invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// Cryptographic signing or serialization failed; no unsigned output is
    /// ever returned
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    /// Signature verification failed (recipient-side check)
    #[error("Signature verification failed: {0}")]
    SignatureVerificationFailed(String),
}
