//! TTL table for cached resources.

use std::collections::HashMap;

use serde::Deserialize;
use vigil_core::Domain;

/// TTL por defecto, en segundos.
pub const DEFAULT_TTL_SECONDS: i64 = 60;

/// Time-to-live configuration.
///
/// Lookup order is resource override, then domain, then the default. A TTL of
/// zero or less disables caching for that resource: reads go straight to the
/// loader and nothing is written.
///
/// ```
/// use vigil_core::Domain;
/// use vigil_server::cache::CacheSettings;
///
/// let settings = CacheSettings::default()
///     .with_domain_ttl(Domain::Blog, 300)
///     .with_resource_ttl(Domain::Blog, "tag", 0);
///
/// assert_eq!(settings.ttl_for(Domain::Blog, "post"), 300);
/// assert_eq!(settings.ttl_for(Domain::Blog, "Tag"), 0);
/// assert_eq!(settings.ttl_for(Domain::Admin, "users"), 60);
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheSettings {
    pub default_ttl_seconds: i64,
    /// TTL por dominio, por nombre (`blog`, `admin`, ...).
    pub domains: HashMap<String, i64>,
    /// TTL por recurso: `resources.<domain>.<resource>`.
    pub resources: HashMap<String, HashMap<String, i64>>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            default_ttl_seconds: DEFAULT_TTL_SECONDS,
            domains: HashMap::new(),
            resources: HashMap::new(),
        }
    }
}

impl CacheSettings {
    pub fn with_default_ttl(mut self, seconds: i64) -> Self {
        self.default_ttl_seconds = seconds;
        self
    }

    pub fn with_domain_ttl(mut self, domain: Domain, seconds: i64) -> Self {
        self.domains.insert(domain.as_str().to_string(), seconds);
        self
    }

    pub fn with_resource_ttl(mut self, domain: Domain, resource: &str, seconds: i64) -> Self {
        self.resources
            .entry(domain.as_str().to_string())
            .or_default()
            .insert(resource.trim().to_lowercase(), seconds);
        self
    }

    /// Resolves the TTL for a resource.
    pub fn ttl_for(&self, domain: Domain, resource: &str) -> i64 {
        let resource = resource.trim().to_lowercase();

        lookup(&self.resources, domain.as_str())
            .and_then(|by_resource| lookup(by_resource, &resource))
            .or_else(|| lookup(&self.domains, domain.as_str()))
            .copied()
            .unwrap_or(self.default_ttl_seconds)
    }

    /// Names in the tables that are not known domains.
    pub fn unknown_domains(&self) -> Vec<String> {
        let mut unknown: Vec<String> = self
            .domains
            .keys()
            .chain(self.resources.keys())
            .filter(|name| name.parse::<Domain>().is_err())
            .cloned()
            .collect();
        unknown.sort();
        unknown.dedup();
        unknown
    }
}

/// Keys in config files keep whatever case the operator wrote.
fn lookup<'a, T>(table: &'a HashMap<String, T>, name: &str) -> Option<&'a T> {
    table.get(name).or_else(|| {
        table
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    })
}
