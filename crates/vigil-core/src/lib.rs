//! Vigil Core - Domain types
//!
//! This crate provides the vocabulary shared by the response cache and the
//! realtime engine: resource domains, caller identity, conversation summaries,
//! push events and the uniform error type.

pub mod error;
pub mod event;
pub mod identity;
pub mod summary;
pub mod types;

pub use error::{Result, VigilError};
pub use event::RealtimeEvent;
pub use identity::{ANONYMOUS_MARKER, CallerIdentity, RESERVED_PREFIX};
pub use summary::ConversationSummary;
pub use types::{Domain, KeyKind, Mutation};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
