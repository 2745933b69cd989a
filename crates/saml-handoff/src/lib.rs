//! Server-side core for single-use, signed SAML 2.0 response handoff
//!
//! This crate implements the identity-provider half of a synchronous
//! request/response exchange with a relying service:
//! - parse an inbound authentication request to recover the delivery URL and
//!   correlation identifier
//! - assemble a time-bounded, signed assertion binding a resolved identity
//!   to that correlation identifier and service
//! - package the signed document plus relay token for form-post delivery
//!
//! Transport, the service registry implementation, and key lifecycle are
//! external collaborators.

pub mod binding;
pub mod clock;
pub mod config;
pub mod error;
pub mod handoff;
pub mod ids;
pub mod registry;
pub mod saml;
pub mod services;

pub use binding::{ServiceBinding, WebTarget};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{IdpConfig, NOT_BEFORE_ISSUE_INSTANT};
pub use error::{SamlError, SamlResult};
pub use handoff::HandoffService;
pub use ids::{IdGenerator, SecureIds};
pub use registry::{
    AttributeUsernameResolver, InMemoryServicesManager, Principal, PrincipalIdResolver,
    RegisteredService, ServicesManager, UsernameResolver,
};
pub use saml::{sign_response, verify_response, SigningKeyPair};
pub use services::{
    AssertionBuilder, ExtractedRequest, PostResponse, RequestParser, ResponseDispatcher,
    ResponseDocument,
};
