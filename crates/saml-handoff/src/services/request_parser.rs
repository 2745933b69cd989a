//! Inbound authentication request extraction
//!
//! Recovers the response delivery URL and the request correlation identifier
//! from a transport-encoded `SAMLRequest` parameter. Malformed or absent
//! payloads are a normal input class (unsolicited flows) and resolve to
//! `None`; extraction never fails with an error.

use base64::{engine::general_purpose::STANDARD, Engine};
use flate2::read::DeflateDecoder;
use std::io::Read;

/// Maximum accepted encoded size for the request parameter (512 KB)
const MAX_ENCODED_SIZE: usize = 512 * 1024;

/// Maximum decompressed size when inflating (64 KB), bounding deflate bombs
const MAX_DECOMPRESSED_SIZE: u64 = 64 * 1024;

/// Output of request extraction: where to deliver the response, and the
/// request's own identifier for subject confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedRequest {
    pub delivery_url: String,
    pub request_id: Option<String>,
}

/// Extractor for inbound authentication requests
pub struct RequestParser;

impl RequestParser {
    /// Decode the transport encoding and extract the delivery URL and
    /// correlation identifier. Returns `None` for absent, undecodable or
    /// not-well-formed payloads.
    pub fn extract(encoded_request: &str) -> Option<ExtractedRequest> {
        let encoded = encoded_request.trim();
        if encoded.is_empty() {
            return None;
        }
        if encoded.len() > MAX_ENCODED_SIZE {
            tracing::debug!(
                size = encoded.len(),
                "Rejecting oversized SAMLRequest payload"
            );
            return None;
        }

        let decoded = STANDARD.decode(encoded).ok()?;
        let xml = Self::inflate_or_passthrough(&decoded)?;
        Self::extract_from_xml(&xml)
    }

    /// Redirect-style encodings deflate the markup before base64; post-style
    /// encodings do not. Try inflation first and fall back to treating the
    /// decoded bytes as the markup itself.
    fn inflate_or_passthrough(decoded: &[u8]) -> Option<String> {
        let decoder = DeflateDecoder::new(decoded);
        let mut inflated = String::new();
        if decoder
            .take(MAX_DECOMPRESSED_SIZE)
            .read_to_string(&mut inflated)
            .is_ok()
            && !inflated.is_empty()
            && (inflated.len() as u64) < MAX_DECOMPRESSED_SIZE
        {
            return Some(inflated);
        }

        String::from_utf8(decoded.to_vec()).ok()
    }

    /// Read the delivery URL and request identifier directly off the root
    /// element of any well-formed document; no schema validation is
    /// performed. A missing delivery URL means no binding can be formed.
    pub fn extract_from_xml(xml: &str) -> Option<ExtractedRequest> {
        use quick_xml::events::Event;
        use quick_xml::Reader;

        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut delivery_url = None;
        let mut request_id = None;
        let mut saw_root = false;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e) | Event::Empty(e)) => {
                    for attr in e.attributes().flatten() {
                        let key = std::str::from_utf8(attr.key.as_ref()).unwrap_or("");
                        match key {
                            "AssertionConsumerServiceURL" => {
                                delivery_url =
                                    Some(attr.unescape_value().ok()?.to_string());
                            }
                            "ID" => {
                                request_id = Some(attr.unescape_value().ok()?.to_string());
                            }
                            _ => {}
                        }
                    }
                    saw_root = true;
                    break;
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    tracing::debug!(error = %e, "Malformed SAMLRequest markup, treating as absent");
                    return None;
                }
                _ => {}
            }
        }

        if !saw_root {
            return None;
        }

        let delivery_url = delivery_url.filter(|url| !url.is_empty())?;

        Some(ExtractedRequest {
            delivery_url,
            request_id: request_id.filter(|id| !id.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::DeflateEncoder;
    use flate2::Compression;
    use std::io::Write;

    const SAMPLE_REQUEST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<samlp:AuthnRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol"
    ID="_abc123"
    Version="2.0"
    AssertionConsumerServiceURL="https://svc.example.org/acs"
    ProtocolBinding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST"/>"#;

    fn encode_plain(xml: &str) -> String {
        STANDARD.encode(xml.as_bytes())
    }

    fn encode_deflated(xml: &str) -> String {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(xml.as_bytes()).unwrap();
        STANDARD.encode(encoder.finish().unwrap())
    }

    #[test]
    fn extracts_url_and_id_from_plain_encoding() {
        let extracted = RequestParser::extract(&encode_plain(SAMPLE_REQUEST)).unwrap();
        assert_eq!(extracted.delivery_url, "https://svc.example.org/acs");
        assert_eq!(extracted.request_id.as_deref(), Some("_abc123"));
    }

    #[test]
    fn extracts_url_and_id_from_deflated_encoding() {
        let extracted = RequestParser::extract(&encode_deflated(SAMPLE_REQUEST)).unwrap();
        assert_eq!(extracted.delivery_url, "https://svc.example.org/acs");
        assert_eq!(extracted.request_id.as_deref(), Some("_abc123"));
    }

    #[test]
    fn minimal_root_element_is_accepted() {
        // Deliberately permissive: no schema validation, any well-formed
        // document with the two attributes is accepted.
        let xml = r#"<AuthnRequest ID="_r" AssertionConsumerServiceURL="https://x.example/a"/>"#;
        let extracted = RequestParser::extract_from_xml(xml).unwrap();
        assert_eq!(extracted.delivery_url, "https://x.example/a");
        assert_eq!(extracted.request_id.as_deref(), Some("_r"));
    }

    #[test]
    fn empty_payload_is_absent() {
        assert_eq!(RequestParser::extract(""), None);
        assert_eq!(RequestParser::extract("   "), None);
    }

    #[test]
    fn invalid_base64_is_absent() {
        assert_eq!(RequestParser::extract("%%%not-base64%%%"), None);
    }

    #[test]
    fn malformed_markup_is_absent() {
        let encoded = encode_plain("<AuthnRequest ID=");
        assert_eq!(RequestParser::extract(&encoded), None);
    }

    #[test]
    fn non_xml_bytes_are_absent() {
        let encoded = STANDARD.encode([0u8, 159, 146, 150]);
        assert_eq!(RequestParser::extract(&encoded), None);
    }

    #[test]
    fn missing_delivery_url_is_absent() {
        let xml = r#"<AuthnRequest ID="_abc123" Version="2.0"/>"#;
        assert_eq!(RequestParser::extract(&encode_plain(xml)), None);
    }

    #[test]
    fn missing_id_yields_request_without_correlation() {
        let xml = r#"<AuthnRequest AssertionConsumerServiceURL="https://svc.example.org/acs"/>"#;
        let extracted = RequestParser::extract(&encode_plain(xml)).unwrap();
        assert_eq!(extracted.request_id, None);
    }

    #[test]
    fn oversized_payload_is_absent() {
        let huge = "A".repeat(MAX_ENCODED_SIZE + 1);
        assert_eq!(RequestParser::extract(&huge), None);
    }

    /// Well-formed request markup padded to an exact decoded length
    fn padded_request(total_len: usize) -> String {
        let shell =
            r#"<AuthnRequest ID="_r" AssertionConsumerServiceURL="https://x.example/a" Pad=""/>"#;
        let pad = total_len - shell.len();
        format!(
            r#"<AuthnRequest ID="_r" AssertionConsumerServiceURL="https://x.example/a" Pad="{}"/>"#,
            "A".repeat(pad)
        )
    }

    #[test]
    fn decompressed_size_cap_rejects_bombs() {
        // Highly compressible 1 MiB body: small on the wire, oversized once
        // inflated.
        let encoded = encode_deflated(&padded_request(1024 * 1024));
        assert!(encoded.len() < MAX_ENCODED_SIZE);
        assert_eq!(RequestParser::extract(&encoded), None);
    }

    #[test]
    fn decompressed_size_cap_is_exclusive() {
        // A payload inflating to exactly the cap is rejected; one byte under
        // is accepted.
        let at_cap = padded_request(MAX_DECOMPRESSED_SIZE as usize);
        assert_eq!(RequestParser::extract(&encode_deflated(&at_cap)), None);

        let under_cap = padded_request(MAX_DECOMPRESSED_SIZE as usize - 1);
        let extracted = RequestParser::extract(&encode_deflated(&under_cap)).unwrap();
        assert_eq!(extracted.delivery_url, "https://x.example/a");
        assert_eq!(extracted.request_id.as_deref(), Some("_r"));
    }

    #[test]
    fn escaped_attribute_values_are_unescaped() {
        let xml = r#"<AuthnRequest ID="_r" AssertionConsumerServiceURL="https://x.example/a?b=1&amp;c=2"/>"#;
        let extracted = RequestParser::extract_from_xml(xml).unwrap();
        assert_eq!(extracted.delivery_url, "https://x.example/a?b=1&c=2");
    }
}
