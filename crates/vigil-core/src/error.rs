//! Error types for Vigil.
//!
//! Every failure that can reach a caller goes through [`VigilError`], a single
//! uniform shape carrying a human-readable message. Cache-layer problems are
//! deliberately absent here: a broken key-value store degrades to a cache miss
//! inside the cache crate and never becomes a `VigilError`.
//!
//! # Example
//!
//! ```
//! use vigil_core::{Result, VigilError};
//!
//! fn load_orders(upstream_up: bool) -> Result<Vec<String>> {
//!     if !upstream_up {
//!         return Err(VigilError::upstream("orders service returned 503"));
//!     }
//!     Ok(vec!["o-1".to_string()])
//! }
//!
//! let err = load_orders(false).unwrap_err();
//! assert!(err.is_user_visible());
//! assert_eq!(err.message(), "orders service returned 503");
//! ```

use thiserror::Error;

/// Main error type for Vigil operations.
///
/// The type is `Clone` so a single upstream failure can be handed to every
/// caller that was waiting on the same in-flight request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VigilError {
    /// An upstream loader failed. Propagated verbatim to the caller.
    #[error("upstream request failed: {message}")]
    Upstream {
        /// Message reported by the upstream collaborator
        message: String,
    },

    /// The operation needs an authenticated caller and none is present.
    #[error("authentication required: {message}")]
    AuthenticationRequired {
        /// What required the identity
        message: String,
    },

    /// A push event could not be decoded.
    #[error("malformed push event: {message}")]
    MalformedEvent {
        /// Why decoding failed
        message: String,
    },

    /// The realtime transport failed or closed.
    #[error("transport failure: {message}")]
    Transport {
        /// Description of the transport failure
        message: String,
    },

    /// A value could not be encoded or decoded as JSON.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A domain name did not match any known resource domain.
    #[error("unknown domain '{0}'")]
    UnknownDomain(String),

    /// Configuration was rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl VigilError {
    /// Creates an upstream failure.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    /// Creates an authentication-required failure.
    pub fn authentication_required(message: impl Into<String>) -> Self {
        Self::AuthenticationRequired {
            message: message.into(),
        }
    }

    /// Creates a malformed-event failure.
    pub fn malformed_event(message: impl Into<String>) -> Self {
        Self::MalformedEvent {
            message: message.into(),
        }
    }

    /// Creates a transport failure.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Returns the human-readable message without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Upstream { message }
            | Self::AuthenticationRequired { message }
            | Self::MalformedEvent { message }
            | Self::Transport { message } => message,
            Self::Serialization(message)
            | Self::UnknownDomain(message)
            | Self::InvalidConfig(message) => message,
        }
    }

    /// Returns true for the only two categories that may reach an end user:
    /// upstream failures and missing authentication.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            Self::Upstream { .. } | Self::AuthenticationRequired { .. }
        )
    }

    /// Returns true if retrying later may succeed on its own.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

impl From<serde_json::Error> for VigilError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Convenience alias for results carrying a [`VigilError`].
pub type Result<T> = std::result::Result<T, VigilError>;
