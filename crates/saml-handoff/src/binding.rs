//! Service binding value objects
//!
//! A [`ServiceBinding`] represents one authentication exchange in flight. It
//! is created once per inbound authentication attempt (or synthesized for a
//! bare, pre-authenticated flow), is immutable thereafter, and is dropped
//! after the response is dispatched or the exchange is abandoned upstream.

use crate::saml::SigningKeyPair;
use crate::services::request_parser::ExtractedRequest;

/// Delivery target for a relying web application.
///
/// A composed value object carrying the registered identifier, the URL the
/// response must be delivered to, and an optional artifact identifier. The
/// identifier defaults to the delivery URL when no distinct artifact or
/// session identifier is supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebTarget {
    id: String,
    original_url: String,
    artifact_id: Option<String>,
}

impl WebTarget {
    /// Target whose id equals its delivery URL (the simple case)
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            id: url.clone(),
            original_url: url,
            artifact_id: None,
        }
    }

    /// Target with a distinct identifier
    pub fn new(
        id: impl Into<String>,
        original_url: impl Into<String>,
        artifact_id: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            original_url: original_url.into(),
            artifact_id,
        }
    }

    /// The service's registered identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Where the signed response must be posted
    pub fn original_url(&self) -> &str {
        &self.original_url
    }

    pub fn artifact_id(&self) -> Option<&str> {
        self.artifact_id.as_deref()
    }
}

/// One authentication exchange in flight.
///
/// Owns the exchange's key pair exclusively for its lifetime; nothing is
/// persisted by this crate.
#[derive(Debug, Clone)]
pub struct ServiceBinding {
    target: WebTarget,
    relay_state: Option<String>,
    request_id: Option<String>,
    keys: SigningKeyPair,
}

impl ServiceBinding {
    /// Build a binding from extractor output plus a relay token and key pair
    pub fn from_request(
        extracted: ExtractedRequest,
        relay_state: Option<String>,
        keys: SigningKeyPair,
    ) -> Self {
        Self {
            target: WebTarget::from_url(extracted.delivery_url),
            relay_state,
            request_id: extracted.request_id,
            keys,
        }
    }

    /// Build a bare binding with no inbound request.
    ///
    /// Used when the flow is driven entirely by the relying application, or
    /// when reconstructing a binding from persisted correlation state. The
    /// resulting assertion omits the `InResponseTo` confirmation entirely
    /// rather than carrying an empty one.
    pub fn bare(
        delivery_url: impl Into<String>,
        relay_state: Option<String>,
        keys: SigningKeyPair,
    ) -> Self {
        Self {
            target: WebTarget::from_url(delivery_url),
            relay_state,
            request_id: None,
            keys,
        }
    }

    /// Build a binding from an explicit target and correlation state.
    ///
    /// Used when reconstructing an exchange from persisted correlation state,
    /// or when the service carries an identifier distinct from its delivery
    /// URL.
    pub fn from_parts(
        target: WebTarget,
        relay_state: Option<String>,
        request_id: Option<String>,
        keys: SigningKeyPair,
    ) -> Self {
        Self {
            target,
            relay_state,
            request_id,
            keys,
        }
    }

    /// The service's registered identifier
    pub fn id(&self) -> &str {
        self.target.id()
    }

    /// Where the signed response must be posted
    pub fn delivery_url(&self) -> &str {
        self.target.original_url()
    }

    /// Opaque relay token, echoed back unmodified
    pub fn relay_state(&self) -> Option<&str> {
        self.relay_state.as_deref()
    }

    /// Correlation identifier from the inbound request, if one was present
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Key pair for this exchange
    pub fn keys(&self) -> &SigningKeyPair {
        &self.keys
    }
}
