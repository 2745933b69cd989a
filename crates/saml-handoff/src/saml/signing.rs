//! Response signing and verification
//!
//! The signer digests and signs the exact bytes the assertion builder
//! emitted, inserting an enveloped `ds:Signature` after the response-level
//! Issuer with the public key embedded as an RSA key value. Verification
//! strips the signature element, recomputes the digest over the remaining
//! bytes and checks the signature over `SignedInfo`, so a recipient holding
//! the embedded key succeeds against the untouched output and any mutation
//! of it fails.

use base64::{engine::general_purpose::STANDARD, Engine};
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private, Public};
use openssl::rsa::Rsa;
use openssl::sign::{Signer, Verifier};

use crate::error::{SamlError, SamlResult};
use crate::saml::xml_escape;
use crate::services::assertion_builder::ResponseDocument;

/// Asymmetric key pair for one exchange.
///
/// Supplied by the caller; this crate never generates or persists keys. The
/// private key is held only in process, the public half is embedded in the
/// signed output for verification by the recipient.
#[derive(Clone)]
pub struct SigningKeyPair {
    private: PKey<Private>,
    public: PKey<Public>,
}

impl std::fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material
        f.debug_struct("SigningKeyPair").finish_non_exhaustive()
    }
}

impl SigningKeyPair {
    /// Build a key pair from an RSA private key, deriving the public half
    pub fn from_rsa(rsa: Rsa<Private>) -> SamlResult<Self> {
        let n = rsa
            .n()
            .to_owned()
            .map_err(|e| SamlError::InvalidKeyMaterial(format!("modulus: {e}")))?;
        let e = rsa
            .e()
            .to_owned()
            .map_err(|e| SamlError::InvalidKeyMaterial(format!("exponent: {e}")))?;
        let public_rsa = Rsa::from_public_components(n, e)
            .map_err(|e| SamlError::InvalidKeyMaterial(format!("public key: {e}")))?;

        Ok(Self {
            private: PKey::from_rsa(rsa)
                .map_err(|e| SamlError::InvalidKeyMaterial(format!("private key: {e}")))?,
            public: PKey::from_rsa(public_rsa)
                .map_err(|e| SamlError::InvalidKeyMaterial(format!("public key: {e}")))?,
        })
    }

    /// Build a key pair from a PEM-encoded RSA private key
    pub fn from_pem(private_key_pem: &[u8]) -> SamlResult<Self> {
        let rsa = Rsa::private_key_from_pem(private_key_pem)
            .map_err(|e| SamlError::InvalidKeyMaterial(format!("Invalid private key PEM: {e}")))?;
        Self::from_rsa(rsa)
    }

    /// The public half of the pair
    pub fn public_key(&self) -> &PKey<Public> {
        &self.public
    }

    /// RSA-SHA256 signature over `data`
    pub fn sign_sha256(&self, data: &[u8]) -> SamlResult<Vec<u8>> {
        let mut signer = Signer::new(MessageDigest::sha256(), &self.private)
            .map_err(|e| SamlError::SigningFailed(format!("Signer creation failed: {e}")))?;
        signer
            .update(data)
            .map_err(|e| SamlError::SigningFailed(format!("Signer update failed: {e}")))?;
        signer
            .sign_to_vec()
            .map_err(|e| SamlError::SigningFailed(format!("Signing failed: {e}")))
    }

    /// Base64-encoded RSA modulus and public exponent, for key embedding
    fn public_components_base64(&self) -> SamlResult<(String, String)> {
        let rsa = self
            .public
            .rsa()
            .map_err(|e| SamlError::InvalidKeyMaterial(format!("Not an RSA key: {e}")))?;
        Ok((
            STANDARD.encode(rsa.n().to_vec()),
            STANDARD.encode(rsa.e().to_vec()),
        ))
    }
}

/// Serialize and sign a constructed response document.
///
/// Returns the signed document string; any key or serialization failure is
/// fatal and no unsigned output is produced.
pub fn sign_response(document: &ResponseDocument, keys: &SigningKeyPair) -> SamlResult<String> {
    let xml = &document.xml;

    let digest = openssl::hash::hash(MessageDigest::sha256(), xml.as_bytes())
        .map_err(|e| SamlError::SigningFailed(format!("Digest failed: {e}")))?;
    let digest_b64 = STANDARD.encode(digest);

    let mut signed_info = String::new();
    signed_info.push_str("<ds:SignedInfo xmlns:ds=\"http://www.w3.org/2000/09/xmldsig#\">");
    signed_info.push_str(
        "<ds:CanonicalizationMethod Algorithm=\"http://www.w3.org/2001/10/xml-exc-c14n#\"/>",
    );
    signed_info.push_str(
        "<ds:SignatureMethod Algorithm=\"http://www.w3.org/2001/04/xmldsig-more#rsa-sha256\"/>",
    );
    signed_info.push_str("<ds:Reference URI=\"#");
    signed_info.push_str(&xml_escape(&document.response_id));
    signed_info.push_str("\">");
    signed_info.push_str("<ds:Transforms>");
    signed_info.push_str(
        "<ds:Transform Algorithm=\"http://www.w3.org/2000/09/xmldsig#enveloped-signature\"/>",
    );
    signed_info.push_str("<ds:Transform Algorithm=\"http://www.w3.org/2001/10/xml-exc-c14n#\"/>");
    signed_info.push_str("</ds:Transforms>");
    signed_info.push_str("<ds:DigestMethod Algorithm=\"http://www.w3.org/2001/04/xmlenc#sha256\"/>");
    signed_info.push_str("<ds:DigestValue>");
    signed_info.push_str(&digest_b64);
    signed_info.push_str("</ds:DigestValue>");
    signed_info.push_str("</ds:Reference>");
    signed_info.push_str("</ds:SignedInfo>");

    let signature = keys.sign_sha256(signed_info.as_bytes())?;
    let signature_b64 = STANDARD.encode(&signature);
    let (modulus_b64, exponent_b64) = keys.public_components_base64()?;

    let mut signature_xml = String::new();
    signature_xml.push_str("<ds:Signature xmlns:ds=\"http://www.w3.org/2000/09/xmldsig#\">");
    signature_xml.push_str(&signed_info);
    signature_xml.push_str("<ds:SignatureValue>");
    signature_xml.push_str(&signature_b64);
    signature_xml.push_str("</ds:SignatureValue>");
    signature_xml.push_str("<ds:KeyInfo><ds:KeyValue><ds:RSAKeyValue><ds:Modulus>");
    signature_xml.push_str(&modulus_b64);
    signature_xml.push_str("</ds:Modulus><ds:Exponent>");
    signature_xml.push_str(&exponent_b64);
    signature_xml.push_str("</ds:Exponent></ds:RSAKeyValue></ds:KeyValue></ds:KeyInfo>");
    signature_xml.push_str("</ds:Signature>");

    // Envelope the signature directly after the response-level Issuer, with
    // no surrounding whitespace so that stripping the element restores the
    // digested bytes exactly.
    let after_issuer = xml
        .find("</saml:Issuer>")
        .map(|pos| pos + "</saml:Issuer>".len())
        .ok_or_else(|| SamlError::SigningFailed("Cannot find response Issuer".to_string()))?;

    let mut result = String::with_capacity(xml.len() + signature_xml.len());
    result.push_str(&xml[..after_issuer]);
    result.push_str(&signature_xml);
    result.push_str(&xml[after_issuer..]);

    tracing::debug!(
        response_id = %document.response_id,
        "SAML response signed"
    );

    Ok(result)
}

/// Verify a signed response against a public key.
///
/// This is the recipient-side check: the digest is recomputed over the
/// document with the signature element removed, then the signature value is
/// verified over the `SignedInfo` bytes.
pub fn verify_response(signed_xml: &str, public_key: &PKey<Public>) -> SamlResult<()> {
    let signed_info = extract_between(signed_xml, "<ds:SignedInfo", "</ds:SignedInfo>")
        .ok_or_else(|| {
            SamlError::SignatureVerificationFailed("No SignedInfo element found".to_string())
        })?;
    let signature_b64 = extract_inner(signed_xml, "<ds:SignatureValue>", "</ds:SignatureValue>")
        .ok_or_else(|| {
            SamlError::SignatureVerificationFailed("No SignatureValue element found".to_string())
        })?;
    let digest_b64 = extract_inner(signed_xml, "<ds:DigestValue>", "</ds:DigestValue>")
        .ok_or_else(|| {
            SamlError::SignatureVerificationFailed("No DigestValue element found".to_string())
        })?;

    // Enveloped-signature transform: digest covers the document without the
    // signature element.
    let unsigned = remove_signature_element(signed_xml).ok_or_else(|| {
        SamlError::SignatureVerificationFailed("No Signature element found".to_string())
    })?;

    let digest = openssl::hash::hash(MessageDigest::sha256(), unsigned.as_bytes())
        .map_err(|e| SamlError::SignatureVerificationFailed(format!("Hash failed: {e}")))?;
    if STANDARD.encode(digest) != digest_b64.replace(['\n', '\r', ' '], "") {
        return Err(SamlError::SignatureVerificationFailed(
            "Digest mismatch".to_string(),
        ));
    }

    let signature_bytes = STANDARD
        .decode(signature_b64.replace(['\n', '\r', ' '], ""))
        .map_err(|e| {
            SamlError::SignatureVerificationFailed(format!("Invalid signature encoding: {e}"))
        })?;

    let mut verifier = Verifier::new(MessageDigest::sha256(), public_key)
        .map_err(|e| SamlError::SignatureVerificationFailed(format!("Verifier failed: {e}")))?;
    verifier
        .update(signed_info.as_bytes())
        .map_err(|e| SamlError::SignatureVerificationFailed(format!("Verifier failed: {e}")))?;
    let valid = verifier
        .verify(&signature_bytes)
        .map_err(|e| SamlError::SignatureVerificationFailed(format!("Verifier failed: {e}")))?;

    if valid {
        Ok(())
    } else {
        Err(SamlError::SignatureVerificationFailed(
            "Invalid signature".to_string(),
        ))
    }
}

/// Slice out an element including its start and end tags
fn extract_between<'a>(xml: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let s = xml.find(start)?;
    let e = xml[s..].find(end)? + s + end.len();
    Some(&xml[s..e])
}

/// Slice out the text content between a start and end tag
fn extract_inner<'a>(xml: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let s = xml.find(start)? + start.len();
    let e = xml[s..].find(end)? + s;
    Some(&xml[s..e])
}

/// Remove the enveloped `ds:Signature` element, restoring the unsigned bytes
fn remove_signature_element(xml: &str) -> Option<String> {
    let sig_start = xml.find("<ds:Signature")?;
    let sig_end = xml.find("</ds:Signature>")? + "</ds:Signature>".len();
    let mut result = String::with_capacity(xml.len());
    result.push_str(&xml[..sig_start]);
    result.push_str(&xml[sig_end..]);
    Some(result)
}
