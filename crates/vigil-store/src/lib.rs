//! Vigil Store - Key-value backends
//!
//! This crate provides the [`KeyValueStore`] abstraction used by the response
//! cache, a Redis-compatible implementation and an in-memory one.

mod connection;
pub mod error;
pub mod memory;
pub mod redis_store;
pub mod traits;

pub use error::StoreError;
pub use memory::{MemoryStore, StoreOps};
pub use redis_store::{RedisStore, RedisStoreConfig};
pub use traits::KeyValueStore;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
