//! Query fingerprinting.
//!
//! Equivalent queries collapse to the same fingerprint: parameters are sorted
//! before hashing, so their order never matters. Response fingerprints also
//! fold in the path, the normalized `Accept-Language` and the caller identity,
//! since those change what the upstream returns.

use std::fmt;

use serde_json::Value;
use sha2::{Digest, Sha256};
use url::form_urlencoded;
use vigil_core::CallerIdentity;

/// SHA-256 hex digest of a canonical query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryFingerprint(String);

impl QueryFingerprint {
    /// Fingerprint of key/value parameters.
    ///
    /// ```
    /// use vigil_server::cache::QueryFingerprint;
    ///
    /// let a = QueryFingerprint::of_params([("page", "1"), ("limit", "10")]);
    /// let b = QueryFingerprint::of_params([("limit", "10"), ("page", "1")]);
    /// assert_eq!(a, b);
    /// assert_eq!(a.as_str().len(), 64);
    /// ```
    pub fn of_params<I, K, V>(params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self::digest(&canonical_params(params))
    }

    /// Fingerprint of a raw query string such as `page=1&limit=10`.
    pub fn from_query_string(query: &str) -> Self {
        let query = query.trim_start_matches('?');
        Self::of_params(form_urlencoded::parse(query.as_bytes()))
    }

    /// Fingerprint of a JSON query object. Object keys are sorted at every
    /// depth; array order is kept.
    pub fn from_json(query: &Value) -> Self {
        let mut canonical = String::new();
        write_canonical_json(query, &mut canonical);
        Self::digest(&canonical)
    }

    /// Fingerprint of a full upstream response.
    pub fn for_response(
        path: &str,
        query: &str,
        accept_language: Option<&str>,
        identity: &CallerIdentity,
    ) -> Self {
        let params = canonical_params(form_urlencoded::parse(
            query.trim_start_matches('?').as_bytes(),
        ));
        let canonical = format!(
            "path={}\nquery={}\nlang={}\nidentity={}",
            normalize_path(path),
            params,
            normalize_language(accept_language),
            identity.cache_identity()
        );
        Self::digest(&canonical)
    }

    /// Derives a fingerprint for the same query inside another scope, such as
    /// one workspace.
    pub fn scoped(&self, scope: &str) -> Self {
        Self::digest(&format!("scope={}\n{}", scope, self.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn digest(canonical: &str) -> Self {
        Self(hex::encode(Sha256::digest(canonical.as_bytes())))
    }
}

impl fmt::Display for QueryFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sorted, percent-encoded `k=v&k=v` form of the parameters.
pub fn canonical_params<I, K, V>(params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut pairs: Vec<(String, String)> = params
        .into_iter()
        .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
        .collect();
    pairs.sort();

    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

/// Lowercased `Accept-Language` with all whitespace removed.
pub fn normalize_language(accept_language: Option<&str>) -> String {
    accept_language
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

fn write_canonical_json(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (i, (key, value)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical_json(value, out);
            }
            out.push('}');
        },
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical_json(item, out);
            }
            out.push(']');
        },
        scalar => out.push_str(&scalar.to_string()),
    }
}
