//! Cache key generation and normalization.

use std::fmt;

use vigil_core::{Domain, KeyKind};

use super::fingerprint::QueryFingerprint;

/// Identificador fijo de las keys de conteo.
pub const COUNT_IDENTIFIER: &str = "all";

/// Recurso bajo el que se guardan las respuestas completas.
pub const RESPONSE_RESOURCE: &str = "response";

/// Key de un valor cacheado: `{domain}:{resource}:{type}:{identifier}`.
/// El recurso se normaliza a lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    domain: Domain,
    resource: String,
    kind: KeyKind,
    identifier: String,
}

impl CacheKey {
    /// Crea una key arbitraria.
    ///
    /// # Examples
    ///
    /// ```
    /// use vigil_core::{Domain, KeyKind};
    /// use vigil_server::cache::CacheKey;
    ///
    /// let key = CacheKey::new(Domain::Blog, "Post", KeyKind::Detail, "42");
    /// assert_eq!(key.to_string(), "blog:post:detail:42");
    /// ```
    pub fn new(
        domain: Domain,
        resource: impl AsRef<str>,
        kind: KeyKind,
        identifier: impl Into<String>,
    ) -> Self {
        Self {
            domain,
            resource: normalize_resource(resource.as_ref()),
            kind,
            identifier: identifier.into(),
        }
    }

    /// Key de una lista, identificada por el fingerprint de la query.
    pub fn list(domain: Domain, resource: impl AsRef<str>, fingerprint: &QueryFingerprint) -> Self {
        Self::new(domain, resource, KeyKind::List, fingerprint.as_str())
    }

    /// Key del conteo de un recurso.
    pub fn count(domain: Domain, resource: impl AsRef<str>) -> Self {
        Self::new(domain, resource, KeyKind::Count, COUNT_IDENTIFIER)
    }

    /// Key de un elemento por id.
    pub fn detail(domain: Domain, resource: impl AsRef<str>, id: impl Into<String>) -> Self {
        Self::new(domain, resource, KeyKind::Detail, id)
    }

    /// Key de una respuesta completa de ecommerce.
    pub fn response(fingerprint: &QueryFingerprint) -> Self {
        Self::new(
            Domain::Ecommerce,
            RESPONSE_RESOURCE,
            KeyKind::Response,
            fingerprint.as_str(),
        )
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Retorna el IndexSet donde se registra esta key, si el tipo lo requiere.
    pub fn index_key(&self) -> Option<IndexSetKey> {
        self.kind
            .is_indexed()
            .then(|| IndexSetKey::new(self.domain, &self.resource))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.domain, self.resource, self.kind, self.identifier
        )
    }
}

/// Key del set que agrupa todas las variantes de lista/conteo de un recurso:
/// `{domain}:list_keys:{resource}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexSetKey {
    domain: Domain,
    resource: String,
}

impl IndexSetKey {
    pub fn new(domain: Domain, resource: impl AsRef<str>) -> Self {
        Self {
            domain,
            resource: normalize_resource(resource.as_ref()),
        }
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }
}

impl fmt::Display for IndexSetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:list_keys:{}", self.domain, self.resource)
    }
}

/// Renderiza keys para el store, con un prefijo opcional compartido por
/// todas las keys de un despliegue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheKeyScheme {
    prefix: Option<String>,
}

impl CacheKeyScheme {
    pub fn new(prefix: Option<&str>) -> Self {
        Self {
            prefix: prefix
                .map(|p| p.trim().trim_end_matches(':'))
                .filter(|p| !p.is_empty())
                .map(str::to_string),
        }
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Key tal como se escribe en el store.
    pub fn render(&self, key: &CacheKey) -> String {
        self.with_prefix(key.to_string())
    }

    /// IndexSet tal como se escribe en el store.
    pub fn render_index(&self, key: &IndexSetKey) -> String {
        self.with_prefix(key.to_string())
    }

    fn with_prefix(&self, key: String) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key,
        }
    }
}

fn normalize_resource(resource: &str) -> String {
    resource.trim().to_lowercase()
}
