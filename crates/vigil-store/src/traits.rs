//! Key-value store trait definition.

use async_trait::async_trait;

use crate::error::StoreError;

/// A shared key-value service holding cached values and index sets.
///
/// The contract mirrors the handful of commands the cache needs:
/// `GET`, `SET .. EX`, `DEL`, `SADD`, `SMEMBERS` and `EXPIRE`. Values are
/// UTF-8 JSON strings; the store never interprets them.
///
/// # Implementors
///
/// - `RedisStore` - a Redis-compatible server over one multiplexed connection
/// - `MemoryStore` - a process-local store used in tests and single-node setups
///
/// # Example
///
/// ```
/// use vigil_store::{KeyValueStore, MemoryStore};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let store = MemoryStore::new();
/// store.set_with_ttl("blog:post:detail:1", r#"{"id":1}"#, 60).await.unwrap();
/// assert!(store.get("blog:post:detail:1").await.unwrap().is_some());
/// # }
/// ```
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads a value. `Ok(None)` when the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Writes a value that expires after `ttl_seconds`.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl_seconds: u64)
    -> Result<(), StoreError>;

    /// Deletes keys and returns how many existed. An empty slice is a no-op.
    async fn delete(&self, keys: &[String]) -> Result<u64, StoreError>;

    /// Adds a member to a set.
    async fn add_to_set(&self, set_key: &str, member: &str) -> Result<(), StoreError>;

    /// Returns every member of a set; empty when the set does not exist.
    async fn members_of(&self, set_key: &str) -> Result<Vec<String>, StoreError>;

    /// Sets a key's time-to-live.
    async fn expire(&self, key: &str, seconds: u64) -> Result<(), StoreError>;

    /// Returns the name of this store, for logs.
    fn name(&self) -> &str;

    /// Returns false when every call will answer [`StoreError::Disabled`].
    fn is_enabled(&self) -> bool {
        true
    }
}
