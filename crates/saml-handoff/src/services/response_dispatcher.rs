//! Outbound response dispatch
//!
//! Packages the signed document plus relay token into the delivery contract:
//! exactly two named fields targeted at the binding's delivery URL, handed
//! off to the transport collaborator. Fire-and-forget; retry and transport
//! failure handling belong to the caller.

use serde::Serialize;

use crate::binding::ServiceBinding;
use crate::saml::{PARAMETER_RELAY_STATE, PARAMETER_SAML_RESPONSE};

/// Delivery payload for a form-post style response
#[derive(Debug, Clone, Serialize)]
pub struct PostResponse {
    /// Where the form must be posted
    pub location: String,
    /// The signed, serialized response document
    pub saml_response: String,
    /// Relay token, echoed byte-for-byte; omitted from the payload if absent
    pub relay_state: Option<String>,
}

impl PostResponse {
    /// The named form fields, in delivery order
    pub fn parameters(&self) -> Vec<(&'static str, &str)> {
        let mut params = vec![(PARAMETER_SAML_RESPONSE, self.saml_response.as_str())];
        if let Some(relay) = self.relay_state.as_deref() {
            params.push((PARAMETER_RELAY_STATE, relay));
        }
        params
    }

    /// Render an auto-submitting HTML form carrying the payload
    pub fn auto_submit_form(&self) -> String {
        let mut inputs = String::new();
        for (name, value) in self.parameters() {
            inputs.push_str(&format!(
                "        <input type=\"hidden\" name=\"{}\" value=\"{}\"/>\n",
                name,
                html_escape(value)
            ));
        }

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <title>SAML SSO</title>
</head>
<body onload="document.forms[0].submit()">
    <noscript>
        <p>JavaScript is disabled. Click the button below to continue.</p>
    </noscript>
    <form method="POST" action="{}">
{}        <noscript>
            <input type="submit" value="Continue"/>
        </noscript>
    </form>
</body>
</html>"#,
            html_escape(&self.location),
            inputs
        )
    }
}

/// Packages signed documents for delivery
pub struct ResponseDispatcher;

impl ResponseDispatcher {
    /// Build the delivery payload for a signed document and its binding
    pub fn dispatch(signed_document: String, binding: &ServiceBinding) -> PostResponse {
        tracing::info!(
            delivery_url = %binding.delivery_url(),
            has_relay_state = binding.relay_state().is_some(),
            "Dispatching signed SAML response"
        );

        PostResponse {
            location: binding.delivery_url().to_string(),
            saml_response: signed_document,
            relay_state: binding.relay_state().map(String::from),
        }
    }
}

/// HTML escape for XSS prevention
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::saml::SigningKeyPair;
    use openssl::rsa::Rsa;

    fn binding(relay: Option<&str>) -> ServiceBinding {
        let keys = SigningKeyPair::from_rsa(Rsa::generate(2048).unwrap()).unwrap();
        ServiceBinding::bare(
            "https://svc.example.org/acs",
            relay.map(String::from),
            keys,
        )
    }

    #[test]
    fn relay_token_passes_through_unmodified() {
        let payload = ResponseDispatcher::dispatch("<signed/>".to_string(), &binding(Some("xyz")));
        let params = payload.parameters();
        assert_eq!(params.len(), 2);
        assert_eq!(params[0], ("SAMLResponse", "<signed/>"));
        assert_eq!(params[1], ("RelayState", "xyz"));
    }

    #[test]
    fn absent_relay_token_is_omitted() {
        let payload = ResponseDispatcher::dispatch("<signed/>".to_string(), &binding(None));
        assert_eq!(payload.parameters().len(), 1);
        assert!(!payload.auto_submit_form().contains("RelayState"));
    }

    #[test]
    fn form_targets_delivery_url_and_escapes_values() {
        let payload = ResponseDispatcher::dispatch(
            "<doc attr=\"v\"/>".to_string(),
            &binding(Some("a&b")),
        );
        let form = payload.auto_submit_form();
        assert!(form.contains("action=\"https://svc.example.org/acs\""));
        assert!(form.contains("value=\"&lt;doc attr=&quot;v&quot;/&gt;\""));
        assert!(form.contains("value=\"a&amp;b\""));
    }
}
