//! Exchange orchestration
//!
//! Ties the pipeline together: inbound request → service binding, then once
//! the authentication result is available, assertion construction → signing
//! → delivery payload. All operations are synchronous and CPU-bound; each
//! exchange owns its binding exclusively, so concurrent exchanges need no
//! coordination.

use std::sync::Arc;

use crate::binding::ServiceBinding;
use crate::clock::{Clock, SystemClock};
use crate::config::IdpConfig;
use crate::error::SamlResult;
use crate::ids::{IdGenerator, SecureIds};
use crate::registry::{Principal, ServicesManager};
use crate::saml::{sign_response, SigningKeyPair};
use crate::services::{AssertionBuilder, PostResponse, RequestParser, ResponseDispatcher};

/// Server-side half of the single-use signed response exchange
pub struct HandoffService {
    config: IdpConfig,
    registry: Arc<dyn ServicesManager>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl HandoffService {
    /// Service with wall-clock time and CSPRNG identifiers
    pub fn new(config: IdpConfig, registry: Arc<dyn ServicesManager>) -> Self {
        Self::with_collaborators(config, registry, Arc::new(SystemClock), Arc::new(SecureIds))
    }

    /// Service with explicit clock and identifier collaborators, so callers
    /// and tests can substitute deterministic fakes
    pub fn with_collaborators(
        config: IdpConfig,
        registry: Arc<dyn ServicesManager>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            config,
            registry,
            clock,
            ids,
        }
    }

    /// Build a binding from the transport-encoded request parameter and the
    /// accompanying relay token.
    ///
    /// `saml_request` is the value of the
    /// [`PARAMETER_SAML_REQUEST`](crate::saml::PARAMETER_SAML_REQUEST) form
    /// field and `relay_state` the value of the
    /// [`PARAMETER_RELAY_STATE`](crate::saml::PARAMETER_RELAY_STATE) field,
    /// both extracted by the transport collaborator.
    ///
    /// Absent, undecodable or malformed request payloads resolve to `None`;
    /// the caller may treat that as an IdP-initiated flow and construct a
    /// bare binding instead.
    pub fn binding_from_request(
        &self,
        saml_request: &str,
        relay_state: Option<&str>,
        keys: SigningKeyPair,
    ) -> Option<ServiceBinding> {
        let extracted = RequestParser::extract(saml_request)?;

        tracing::info!(
            delivery_url = %extracted.delivery_url,
            request_id = extracted.request_id.as_deref().unwrap_or("<none>"),
            "SAML authentication request received"
        );

        Some(ServiceBinding::from_request(
            extracted,
            relay_state.map(String::from),
            keys,
        ))
    }

    /// Produce the signed delivery payload for a resolved authentication.
    ///
    /// Fatal failures (unregistered service, unresolvable username, signing
    /// failure) surface as distinct errors and never yield a partial or
    /// unsigned payload.
    pub fn response_for(
        &self,
        binding: &ServiceBinding,
        principal: &Principal,
    ) -> SamlResult<PostResponse> {
        let document = AssertionBuilder::new(&self.config).build(
            binding,
            self.registry.as_ref(),
            principal,
            self.clock.as_ref(),
            self.ids.as_ref(),
        )?;

        let signed = sign_response(&document, binding.keys())?;

        tracing::info!(
            service_id = %binding.id(),
            response_id = %document.response_id,
            "SAML response generated"
        );

        Ok(ResponseDispatcher::dispatch(signed, binding))
    }
}
