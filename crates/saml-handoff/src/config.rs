//! Identity provider configuration

use serde::{Deserialize, Serialize};

/// Fixed lower bound for the assertion Conditions window.
///
/// This is a historical constant, not a value derived from the current time.
/// Recipients treat the `[NotBefore, NotOnOrAfter)` interval as the validity
/// window; keeping the lower bound fixed makes the window intentionally
/// permissive on that side. Do not replace with a "now minus skew"
/// computation.
pub const NOT_BEFORE_ISSUE_INSTANT: &str = "2003-04-17T00:46:02Z";

/// Configuration for the issuing identity provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdpConfig {
    /// Issuer URI embedded in the response and assertion
    pub issuer: String,
}

impl Default for IdpConfig {
    fn default() -> Self {
        Self {
            issuer: "https://www.opensaml.org/IDP".to_string(),
        }
    }
}

impl IdpConfig {
    /// Create a configuration with an explicit issuer URI
    pub fn with_issuer(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
        }
    }
}
