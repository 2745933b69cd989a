//! Secure random identifier generation
//!
//! Response and assertion IDs must be unguessable and unique per response to
//! prevent replay or substitution across exchanges, so generation goes
//! through a trait that tests can replace with a deterministic sequence.

use uuid::Uuid;

/// Generator for protocol message identifiers
pub trait IdGenerator: Send + Sync {
    /// Produce a fresh identifier, valid as an XML ID (leading underscore)
    fn new_id(&self) -> String;
}

/// CSPRNG-backed generator (UUID v4)
#[derive(Debug, Clone, Copy, Default)]
pub struct SecureIds;

impl IdGenerator for SecureIds {
    fn new_id(&self) -> String {
        format!("_{}", Uuid::new_v4().simple())
    }
}
