//! End-to-end exchange tests
//!
//! Run with: cargo test -p saml-handoff --test handoff_tests
//!
//! Covers the full pipeline: inbound request extraction, binding
//! construction, assertion building, signing, and the delivery payload.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use openssl::rsa::Rsa;

use saml_handoff::{
    verify_response, AttributeUsernameResolver, FixedClock, HandoffService, IdGenerator,
    IdpConfig, InMemoryServicesManager, Principal, RegisteredService, SamlError, SecureIds,
    ServiceBinding, SigningKeyPair,
};

const ACS_URL: &str = "https://svc.example.org/acs";

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn test_keys() -> SigningKeyPair {
    SigningKeyPair::from_rsa(Rsa::generate(2048).unwrap()).unwrap()
}

fn registry() -> Arc<InMemoryServicesManager> {
    let mut registry = InMemoryServicesManager::new();
    registry.register(
        RegisteredService::new(ACS_URL, "hosted application").with_username_policy(Arc::new(
            AttributeUsernameResolver::new("mail"),
        )),
    );
    Arc::new(registry)
}

fn handoff_service() -> HandoffService {
    HandoffService::new(IdpConfig::default(), registry())
}

fn alice() -> Principal {
    Principal::new("alice").with_attribute("mail", "alice@example.org")
}

fn encoded_request() -> String {
    STANDARD.encode(format!(
        r#"<AuthnRequest ID="_abc123" AssertionConsumerServiceURL="{ACS_URL}"/>"#
    ))
}

#[test]
fn full_exchange_produces_verified_payload() {
    init_tracing();
    let svc = handoff_service();
    let keys = test_keys();
    let public = keys.public_key().clone();

    let binding = svc
        .binding_from_request(&encoded_request(), Some("xyz"), keys)
        .expect("binding from request");
    assert_eq!(binding.delivery_url(), ACS_URL);
    assert_eq!(binding.request_id(), Some("_abc123"));

    let payload = svc.response_for(&binding, &alice()).expect("response");

    // Delivery contract: two named fields, targeted at the delivery URL.
    assert_eq!(payload.location, ACS_URL);
    let params = payload.parameters();
    assert_eq!(params.len(), 2);
    assert_eq!(params[0].0, "SAMLResponse");
    assert_eq!(params[1], ("RelayState", "xyz"));

    // The document asserts the resolved identity against the request.
    assert!(payload.saml_response.contains(">alice@example.org</saml:NameID>"));
    assert!(payload.saml_response.contains("InResponseTo=\"_abc123\""));
    assert!(payload
        .saml_response
        .contains(&format!("<saml:Audience>{ACS_URL}</saml:Audience>")));

    // Verification against the embedded key pair succeeds untouched.
    verify_response(&payload.saml_response, &public).expect("signature verifies");
}

#[test]
fn mutated_output_fails_verification() {
    init_tracing();
    let svc = handoff_service();
    let keys = test_keys();
    let public = keys.public_key().clone();

    let binding = svc
        .binding_from_request(&encoded_request(), None, keys)
        .unwrap();
    let payload = svc.response_for(&binding, &alice()).unwrap();

    let mutated = payload
        .saml_response
        .replace("alice@example.org", "mallory@example.org");
    assert_ne!(mutated, payload.saml_response);
    assert!(verify_response(&mutated, &public).is_err());
}

#[test]
fn distinct_constructions_yield_distinct_ids() {
    init_tracing();
    let svc = handoff_service();
    let binding = ServiceBinding::bare(ACS_URL, None, test_keys());

    let first = svc.response_for(&binding, &alice()).unwrap();
    let second = svc.response_for(&binding, &alice()).unwrap();
    assert_ne!(first.saml_response, second.saml_response);

    let id_of = |doc: &str| {
        let start = doc.find("ID=\"").unwrap() + 4;
        doc[start..start + 33].to_string()
    };
    assert_ne!(id_of(&first.saml_response), id_of(&second.saml_response));
}

#[test]
fn timestamps_are_internally_consistent() {
    init_tracing();
    let clock = FixedClock("2024-06-01T12:00:00Z".parse().unwrap());
    let svc = HandoffService::with_collaborators(
        IdpConfig::default(),
        registry(),
        Arc::new(clock),
        Arc::new(SecureIds),
    );
    let binding = ServiceBinding::bare(ACS_URL, None, test_keys());
    let payload = svc.response_for(&binding, &alice()).unwrap();
    let doc = &payload.saml_response;

    // Conditions NotOnOrAfter == SubjectConfirmationData NotOnOrAfter ==
    // AuthnInstant: a single captured "now" flows everywhere.
    assert_eq!(doc.matches("NotOnOrAfter=\"2024-06-01T12:00:00Z\"").count(), 2);
    assert!(doc.contains("AuthnInstant=\"2024-06-01T12:00:00Z\""));
    assert!(doc.contains("IssueInstant=\"2024-06-01T12:00:00Z\""));
    // Lower bound stays pinned to the historical constant.
    assert!(doc.contains("NotBefore=\"2003-04-17T00:46:02Z\""));
}

#[test]
fn bare_binding_omits_subject_confirmation_correlation() {
    init_tracing();
    let svc = handoff_service();
    let binding = ServiceBinding::bare(ACS_URL, Some("resume-7".to_string()), test_keys());
    let payload = svc.response_for(&binding, &alice()).unwrap();

    assert!(!payload.saml_response.contains("InResponseTo"));
    assert_eq!(payload.relay_state.as_deref(), Some("resume-7"));
}

#[test]
fn empty_request_payload_yields_no_binding() {
    init_tracing();
    let svc = handoff_service();
    assert!(svc.binding_from_request("", Some("xyz"), test_keys()).is_none());
}

#[test]
fn unregistered_service_fails_with_no_output() {
    init_tracing();
    let svc = handoff_service();
    let binding = ServiceBinding::bare("https://unknown.example.org/acs", None, test_keys());

    let err = svc.response_for(&binding, &alice()).unwrap_err();
    assert!(matches!(err, SamlError::UnregisteredService(_)));
}

#[test]
fn look_alike_host_is_not_treated_as_registered() {
    init_tracing();
    // Registration without a trailing slash covers its own path family only;
    // a delivery URL that continues the host string must stay unregistered
    // and never receive a signed response.
    let mut registry = InMemoryServicesManager::new();
    registry.register(RegisteredService::new("https://svc.example.org", "base"));
    let svc = HandoffService::new(IdpConfig::default(), Arc::new(registry));

    let binding =
        ServiceBinding::bare("https://svc.example.org.evil.com/acs", None, test_keys());
    let err = svc
        .response_for(&binding, &Principal::new("alice@example.org"))
        .unwrap_err();
    assert!(matches!(err, SamlError::UnregisteredService(_)));
}

#[test]
fn unresolvable_identity_fails_with_no_output() {
    init_tracing();
    let svc = handoff_service();
    let binding = ServiceBinding::bare(ACS_URL, None, test_keys());

    // The registered policy reads the "mail" attribute, which is missing.
    let err = svc
        .response_for(&binding, &Principal::new("no-mail"))
        .unwrap_err();
    assert!(matches!(err, SamlError::UsernameResolutionFailed(_)));
}

#[test]
fn deterministic_ids_flow_into_the_document() {
    init_tracing();

    struct SequenceIds(std::sync::atomic::AtomicU64);
    impl IdGenerator for SequenceIds {
        fn new_id(&self) -> String {
            let n = self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            format!("_seq{n}")
        }
    }

    let svc = HandoffService::with_collaborators(
        IdpConfig::default(),
        registry(),
        Arc::new(FixedClock("2024-06-01T12:00:00Z".parse().unwrap())),
        Arc::new(SequenceIds(std::sync::atomic::AtomicU64::new(0))),
    );
    let binding = ServiceBinding::bare(ACS_URL, None, test_keys());
    let payload = svc.response_for(&binding, &alice()).unwrap();

    assert!(payload.saml_response.contains("ID=\"_seq0\""));
    assert!(payload.saml_response.contains("ID=\"_seq1\""));
    assert!(payload.saml_response.contains("URI=\"#_seq0\""));
}

#[test]
fn auto_submit_form_carries_both_fields() {
    init_tracing();
    let svc = handoff_service();
    let keys = test_keys();
    let binding = svc
        .binding_from_request(&encoded_request(), Some("xyz"), keys)
        .unwrap();
    let payload = svc.response_for(&binding, &alice()).unwrap();
    let form = payload.auto_submit_form();

    assert!(form.contains(&format!("action=\"{ACS_URL}\"")));
    assert!(form.contains("name=\"SAMLResponse\""));
    assert!(form.contains("name=\"RelayState\" value=\"xyz\""));
}
