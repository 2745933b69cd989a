//! SAML protocol constants and markup utilities

pub mod signing;

pub use signing::{sign_response, verify_response, SigningKeyPair};

/// Inbound authentication request parameter name
pub const PARAMETER_SAML_REQUEST: &str = "SAMLRequest";

/// Outbound signed response parameter name
pub const PARAMETER_SAML_RESPONSE: &str = "SAMLResponse";

/// Opaque relay token parameter name, echoed back unmodified
pub const PARAMETER_RELAY_STATE: &str = "RelayState";

/// Success status code URI
pub const STATUS_SUCCESS: &str = "urn:oasis:names:tc:SAML:2.0:status:Success";

/// Email-format NameID
pub const NAMEID_FORMAT_EMAIL: &str = "urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress";

/// Bearer subject confirmation method
pub const CONFIRMATION_METHOD_BEARER: &str = "urn:oasis:names:tc:SAML:2.0:cm:bearer";

/// Password-class authentication context
pub const AUTHN_CONTEXT_PASSWORD: &str = "urn:oasis:names:tc:SAML:2.0:ac:classes:Password";

/// XML escape special characters
pub fn xml_escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&apos;"),
            _ => result.push(c),
        }
    }
    result
}
