//! Assertion and response construction
//!
//! Builds the unsigned response document for one exchange: success status,
//! conditions window, email-format subject with bearer confirmation, and a
//! password-class authentication statement. Every timestamp in the document
//! derives from a single captured `now` so the window computation is
//! internally consistent.

use chrono::{DateTime, Utc};

use crate::binding::ServiceBinding;
use crate::clock::Clock;
use crate::config::{IdpConfig, NOT_BEFORE_ISSUE_INSTANT};
use crate::error::{SamlError, SamlResult};
use crate::ids::IdGenerator;
use crate::registry::{Principal, ServicesManager};
use crate::saml::{
    xml_escape, AUTHN_CONTEXT_PASSWORD, CONFIRMATION_METHOD_BEARER, NAMEID_FORMAT_EMAIL,
    STATUS_SUCCESS,
};

/// An unsigned, ephemeral response document
#[derive(Debug, Clone)]
pub struct ResponseDocument {
    /// Serialized markup, ready for signing
    pub xml: String,
    /// Outer response identifier
    pub response_id: String,
    /// Assertion identifier
    pub assertion_id: String,
    /// The single captured construction instant
    pub issue_instant: DateTime<Utc>,
}

/// Short-lived builder, consumed once per exchange
pub struct AssertionBuilder<'a> {
    config: &'a IdpConfig,
}

impl<'a> AssertionBuilder<'a> {
    pub fn new(config: &'a IdpConfig) -> Self {
        Self { config }
    }

    /// Construct the response document for an exchange.
    ///
    /// Looks up the registered service definition for the binding's id and
    /// asks its username policy to resolve the asserted identifier. A missing
    /// registration or an unresolvable identifier is fatal for the exchange.
    pub fn build(
        &self,
        binding: &ServiceBinding,
        registry: &dyn ServicesManager,
        principal: &Principal,
        clock: &dyn Clock,
        ids: &dyn IdGenerator,
    ) -> SamlResult<ResponseDocument> {
        let service = registry
            .find_service_by(binding)
            .ok_or_else(|| SamlError::UnregisteredService(binding.id().to_string()))?;

        let username = service
            .resolve_username(principal, binding)
            .ok_or_else(|| SamlError::UsernameResolutionFailed(service.id().to_string()))?;

        // One wall-clock read per construction; reused for every timestamp.
        let now = clock.now();
        let response_id = ids.new_id();
        let assertion_id = ids.new_id();

        tracing::debug!(
            service_id = %service.id(),
            request_id = binding.request_id().unwrap_or("<unsolicited>"),
            "Building SAML response"
        );

        let xml = self.render(binding, &username, now, &response_id, &assertion_id);

        Ok(ResponseDocument {
            xml,
            response_id,
            assertion_id,
            issue_instant: now,
        })
    }

    fn render(
        &self,
        binding: &ServiceBinding,
        username: &str,
        now: DateTime<Utc>,
        response_id: &str,
        assertion_id: &str,
    ) -> String {
        let instant = now.format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let issuer = xml_escape(&self.config.issuer);

        // Omitted entirely for bare bindings; never emitted empty.
        let in_response_to = binding
            .request_id()
            .map(|id| format!(" InResponseTo=\"{}\"", xml_escape(id)))
            .unwrap_or_default();

        let mut xml = String::new();
        xml.push_str("<samlp:Response xmlns:samlp=\"urn:oasis:names:tc:SAML:2.0:protocol\" ");
        xml.push_str("xmlns:saml=\"urn:oasis:names:tc:SAML:2.0:assertion\" ID=\"");
        xml.push_str(&xml_escape(response_id));
        xml.push_str("\" Version=\"2.0\" IssueInstant=\"");
        xml.push_str(&instant);
        xml.push_str("\" Destination=\"");
        xml.push_str(&xml_escape(binding.delivery_url()));
        xml.push('"');
        xml.push_str(&in_response_to);
        xml.push_str("><saml:Issuer>");
        xml.push_str(&issuer);
        xml.push_str("</saml:Issuer>");
        xml.push_str("<samlp:Status><samlp:StatusCode Value=\"");
        xml.push_str(STATUS_SUCCESS);
        xml.push_str("\"/></samlp:Status>");
        xml.push_str("<saml:Assertion ID=\"");
        xml.push_str(&xml_escape(assertion_id));
        xml.push_str("\" Version=\"2.0\" IssueInstant=\"");
        xml.push_str(&instant);
        xml.push_str("\"><saml:Issuer>");
        xml.push_str(&issuer);
        xml.push_str("</saml:Issuer>");
        xml.push_str("<saml:Subject><saml:NameID Format=\"");
        xml.push_str(NAMEID_FORMAT_EMAIL);
        xml.push_str("\">");
        xml.push_str(&xml_escape(username));
        xml.push_str("</saml:NameID><saml:SubjectConfirmation Method=\"");
        xml.push_str(CONFIRMATION_METHOD_BEARER);
        xml.push_str("\"><saml:SubjectConfirmationData NotOnOrAfter=\"");
        xml.push_str(&instant);
        xml.push_str("\" Recipient=\"");
        xml.push_str(&xml_escape(binding.delivery_url()));
        xml.push('"');
        xml.push_str(&in_response_to);
        xml.push_str("/></saml:SubjectConfirmation></saml:Subject>");
        xml.push_str("<saml:Conditions NotBefore=\"");
        xml.push_str(NOT_BEFORE_ISSUE_INSTANT);
        xml.push_str("\" NotOnOrAfter=\"");
        xml.push_str(&instant);
        xml.push_str("\"><saml:AudienceRestriction><saml:Audience>");
        xml.push_str(&xml_escape(binding.id()));
        xml.push_str("</saml:Audience></saml:AudienceRestriction></saml:Conditions>");
        xml.push_str("<saml:AuthnStatement AuthnInstant=\"");
        xml.push_str(&instant);
        xml.push_str("\"><saml:AuthnContext><saml:AuthnContextClassRef>");
        xml.push_str(AUTHN_CONTEXT_PASSWORD);
        xml.push_str("</saml:AuthnContextClassRef></saml:AuthnContext></saml:AuthnStatement>");
        xml.push_str("</saml:Assertion></samlp:Response>");

        xml
    }
}
