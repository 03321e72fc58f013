//! Common type definitions for Vigil.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::VigilError;

/// Resource domain a cached value belongs to.
///
/// The string form is the first segment of every cache key.
///
/// # Example
///
/// ```
/// use vigil_core::Domain;
///
/// let domain: Domain = "blog".parse().unwrap();
/// assert_eq!(domain, Domain::Blog);
/// assert_eq!(domain.to_string(), "blog");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Admin,
    Blog,
    Ecommerce,
    Profile,
    Workspace,
}

impl Domain {
    /// All known domains.
    pub const ALL: [Domain; 5] = [
        Domain::Admin,
        Domain::Blog,
        Domain::Ecommerce,
        Domain::Profile,
        Domain::Workspace,
    ];

    /// Returns the key segment for this domain.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Blog => "blog",
            Self::Ecommerce => "ecommerce",
            Self::Profile => "profile",
            Self::Workspace => "workspace",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = VigilError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Domain::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| VigilError::UnknownDomain(s.to_string()))
    }
}

/// Variant of a cached value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    /// A parameterized list query.
    List,
    /// The collection size.
    Count,
    /// A single resource by id.
    Detail,
    /// A whole upstream response.
    Response,
}

impl KeyKind {
    /// Returns the key segment for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Count => "count",
            Self::Detail => "detail",
            Self::Response => "response",
        }
    }

    /// Returns true for the kinds tracked in an index set.
    pub fn is_indexed(&self) -> bool {
        !matches!(self, Self::Detail)
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of write performed against an upstream resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mutation {
    Create,
    Update,
    Delete,
}

impl Mutation {
    /// Returns true if the mutation also stales the resource's detail entry.
    pub fn touches_detail(&self) -> bool {
        !matches!(self, Self::Create)
    }
}
