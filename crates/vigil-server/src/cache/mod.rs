//! Response cache for the Vigil server.
//!
//! Values live in a shared [`KeyValueStore`](vigil_store::KeyValueStore)
//! under `{domain}:{resource}:{type}:{identifier}` keys. List and count
//! variants are tracked in per-resource index sets so a write can invalidate
//! every cached query of a collection at once.

pub mod domains;
pub mod fingerprint;
pub mod generation;
pub mod inflight;
pub mod invalidation;
pub mod keys;
pub mod resource;
pub mod settings;

// Re-exports
pub use domains::{
    AdminCache, AdminResource, BlogCache, BlogResource, CacheResource, DomainCache,
    EcommerceCache, ProfileCache, ProfileSection, WorkspaceCache, WorkspaceResource,
};
pub use fingerprint::QueryFingerprint;
pub use generation::Generations;
pub use inflight::InFlightRegistry;
pub use invalidation::InvalidationResult;
pub use keys::{CacheKey, CacheKeyScheme, IndexSetKey};
pub use resource::{CacheStatus, Fetched, ResourceCache};
pub use settings::CacheSettings;
