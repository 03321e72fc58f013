//! Caller identity resolved once per request.

use std::fmt;

use crate::error::{Result, VigilError};

/// Identity key used for anonymous callers.
///
/// [`CallerIdentity::from_subject`] treats every subject starting with
/// [`RESERVED_PREFIX`] as anonymous, so this marker cannot collide with an
/// authenticated caller.
pub const ANONYMOUS_MARKER: &str = "~anonymous";

/// Prefix reserved for internal identity markers.
pub const RESERVED_PREFIX: char = '~';

/// Who is making the current request.
///
/// Resolve it once at the edge and pass it down explicitly; fingerprinting and
/// authenticated façades read it instead of re-deriving it from cookies.
///
/// # Example
///
/// ```
/// use vigil_core::CallerIdentity;
///
/// let anon = CallerIdentity::from_subject(None);
/// assert!(anon.require_subject().is_err());
///
/// let user = CallerIdentity::from_subject(Some("u-42"));
/// assert_eq!(user.require_subject().unwrap(), "u-42");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum CallerIdentity {
    /// A session subject is known.
    Authenticated { subject: String },
    /// No session.
    #[default]
    Anonymous,
}

impl CallerIdentity {
    /// Builds an identity from an optional subject. Blank subjects and subjects
    /// using the reserved `~` prefix are anonymous.
    pub fn from_subject(subject: Option<&str>) -> Self {
        match subject.map(str::trim) {
            Some(s) if !s.is_empty() && !s.starts_with(RESERVED_PREFIX) => Self::Authenticated {
                subject: s.to_string(),
            },
            _ => Self::Anonymous,
        }
    }

    /// Returns the subject id, if authenticated.
    pub fn subject(&self) -> Option<&str> {
        match self {
            Self::Authenticated { subject } => Some(subject),
            Self::Anonymous => None,
        }
    }

    /// Returns true if a subject is known.
    pub fn is_authenticated(&self) -> bool {
        self.subject().is_some()
    }

    /// Returns the value folded into response fingerprints.
    pub fn cache_identity(&self) -> &str {
        self.subject().unwrap_or(ANONYMOUS_MARKER)
    }

    /// Returns the subject or fails with `AuthenticationRequired`.
    ///
    /// Call this before any network work; the failure is never retried.
    pub fn require_subject(&self) -> Result<&str> {
        self.subject().ok_or_else(|| {
            VigilError::authentication_required("this resource needs a signed-in caller")
        })
    }
}

impl fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cache_identity())
    }
}
