//! Service registry and username resolution contracts
//!
//! The registry that maps a service to its registered policy is an external
//! collaborator; this module defines the narrow interfaces the core consumes
//! plus an in-memory implementation for tests and simple deployments.

use std::collections::HashMap;
use std::sync::Arc;

use crate::binding::ServiceBinding;

/// Authenticated principal produced by the surrounding authentication
/// process. Opaque to this core apart from its identifier and attributes.
#[derive(Debug, Clone, Default)]
pub struct Principal {
    pub id: String,
    pub attributes: HashMap<String, String>,
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// Policy that resolves the display identifier asserted for a principal
pub trait UsernameResolver: Send + Sync {
    /// Resolve an identifier, or `None` if no usable identifier exists
    fn resolve_username(&self, principal: &Principal, binding: &ServiceBinding) -> Option<String>;
}

/// Default policy: assert the principal's own identifier
#[derive(Debug, Clone, Copy, Default)]
pub struct PrincipalIdResolver;

impl UsernameResolver for PrincipalIdResolver {
    fn resolve_username(&self, principal: &Principal, _binding: &ServiceBinding) -> Option<String> {
        if principal.id.is_empty() {
            None
        } else {
            Some(principal.id.clone())
        }
    }
}

/// Policy: assert a named principal attribute (e.g. `mail`)
#[derive(Debug, Clone)]
pub struct AttributeUsernameResolver {
    pub attribute: String,
}

impl AttributeUsernameResolver {
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
        }
    }
}

impl UsernameResolver for AttributeUsernameResolver {
    fn resolve_username(&self, principal: &Principal, _binding: &ServiceBinding) -> Option<String> {
        principal
            .attributes
            .get(&self.attribute)
            .filter(|v| !v.is_empty())
            .cloned()
    }
}

/// A registered service definition with its username policy
pub struct RegisteredService {
    id: String,
    name: String,
    username_policy: Arc<dyn UsernameResolver>,
}

impl RegisteredService {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            username_policy: Arc::new(PrincipalIdResolver),
        }
    }

    pub fn with_username_policy(mut self, policy: Arc<dyn UsernameResolver>) -> Self {
        self.username_policy = policy;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve the identifier to assert for this principal and exchange
    pub fn resolve_username(
        &self,
        principal: &Principal,
        binding: &ServiceBinding,
    ) -> Option<String> {
        self.username_policy.resolve_username(principal, binding)
    }
}

impl std::fmt::Debug for RegisteredService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredService")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Registry of service definitions, keyed by the binding's id
pub trait ServicesManager: Send + Sync {
    /// Find the registered definition for an in-flight exchange
    fn find_service_by(&self, binding: &ServiceBinding) -> Option<Arc<RegisteredService>>;
}

/// In-memory registry.
///
/// Matches on exact id first, then on registered ids that cover the
/// binding's id as a URL family, so one registration can cover a family of
/// delivery endpoints.
#[derive(Default)]
pub struct InMemoryServicesManager {
    services: Vec<Arc<RegisteredService>>,
}

impl InMemoryServicesManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, service: RegisteredService) {
        self.services.push(Arc::new(service));
    }
}

impl ServicesManager for InMemoryServicesManager {
    fn find_service_by(&self, binding: &ServiceBinding) -> Option<Arc<RegisteredService>> {
        self.services
            .iter()
            .find(|svc| svc.id() == binding.id())
            .or_else(|| {
                self.services
                    .iter()
                    .find(|svc| covers_as_url_family(svc.id(), binding.id()))
            })
            .cloned()
    }
}

/// True when `registered` covers `candidate` as a URL-prefix family.
///
/// The prefix must end at a path or query boundary: a registration for
/// `https://svc.example.org` covers `https://svc.example.org/acs` but not a
/// look-alike host such as `https://svc.example.org.evil.com/acs`.
fn covers_as_url_family(registered: &str, candidate: &str) -> bool {
    match candidate.strip_prefix(registered) {
        Some("") => true,
        Some(rest) => {
            registered.ends_with('/') || rest.starts_with('/') || rest.starts_with('?')
        }
        None => false,
    }
}
