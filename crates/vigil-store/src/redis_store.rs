//! Redis-compatible key-value store.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, RedisError};
use tracing::{debug, warn};

use crate::connection::LazyConnection;
use crate::error::StoreError;
use crate::traits::KeyValueStore;

/// Connection settings for [`RedisStore`].
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Connection URL, e.g. `redis://cache:6379/0`.
    pub url: String,
    /// Upper bound for establishing the connection.
    pub connect_timeout: Duration,
}

impl RedisStoreConfig {
    /// Creates a config for the given URL with default timeouts.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// Key-value store backed by a Redis-compatible server.
///
/// The connection is opened lazily on the first command and shared by every
/// caller afterwards. When a command fails at the connection level the handle
/// is dropped and the next command reconnects. A store built with
/// [`RedisStore::disabled`] answers [`StoreError::Disabled`] to everything.
pub struct RedisStore {
    client: Option<Client>,
    config: Option<RedisStoreConfig>,
    connection: LazyConnection<MultiplexedConnection>,
}

impl RedisStore {
    /// Creates a store for the given server. No connection is made yet.
    ///
    /// # Errors
    ///
    /// `Unavailable` if the URL cannot be parsed.
    pub fn open(config: RedisStoreConfig) -> Result<Self, StoreError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| StoreError::unavailable(format!("invalid store URL: {}", e)))?;

        Ok(Self {
            client: Some(client),
            config: Some(config),
            connection: LazyConnection::new(),
        })
    }

    /// Creates a store with no backing server.
    pub fn disabled() -> Self {
        Self {
            client: None,
            config: None,
            connection: LazyConnection::new(),
        }
    }

    /// Number of connection attempts made so far.
    pub fn connect_attempts(&self) -> u64 {
        self.connection.attempts()
    }

    async fn conn(&self) -> Result<(u64, MultiplexedConnection), StoreError> {
        let (Some(client), Some(config)) = (&self.client, &self.config) else {
            return Err(StoreError::Disabled);
        };

        let client = client.clone();
        let timeout = config.connect_timeout;

        self.connection
            .get_or_connect(move || async move {
                match tokio::time::timeout(timeout, client.get_multiplexed_async_connection())
                    .await
                {
                    Ok(Ok(conn)) => Ok(conn),
                    Ok(Err(e)) => Err(StoreError::unavailable(e.to_string())),
                    Err(_) => Err(StoreError::unavailable(format!(
                        "connect timed out after {}ms",
                        timeout.as_millis()
                    ))),
                }
            })
            .await
    }

    /// Maps a command error, dropping the connection if it is broken.
    fn fail(&self, attempt: u64, command: &'static str, err: RedisError) -> StoreError {
        if is_connection_error(&err) {
            warn!(command, error = %err, "Key-value store connection lost");
            self.connection.invalidate(attempt);
            StoreError::unavailable(err.to_string())
        } else {
            debug!(command, error = %err, "Key-value store command failed");
            StoreError::command(command, err.to_string())
        }
    }
}

fn is_connection_error(err: &RedisError) -> bool {
    err.is_io_error()
        || err.is_connection_dropped()
        || err.is_connection_refusal()
        || err.is_timeout()
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let (attempt, mut conn) = self.conn().await?;
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|e| self.fail(attempt, "GET", e))
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: u64,
    ) -> Result<(), StoreError> {
        let (attempt, mut conn) = self.conn().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl_seconds)
            .await
            .map_err(|e| self.fail(attempt, "SET", e))
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, StoreError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let (attempt, mut conn) = self.conn().await?;
        conn.del::<_, u64>(keys.to_vec())
            .await
            .map_err(|e| self.fail(attempt, "DEL", e))
    }

    async fn add_to_set(&self, set_key: &str, member: &str) -> Result<(), StoreError> {
        let (attempt, mut conn) = self.conn().await?;
        conn.sadd::<_, _, ()>(set_key, member)
            .await
            .map_err(|e| self.fail(attempt, "SADD", e))
    }

    async fn members_of(&self, set_key: &str) -> Result<Vec<String>, StoreError> {
        let (attempt, mut conn) = self.conn().await?;
        conn.smembers::<_, Vec<String>>(set_key)
            .await
            .map_err(|e| self.fail(attempt, "SMEMBERS", e))
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<(), StoreError> {
        let seconds = i64::try_from(seconds).unwrap_or(i64::MAX);
        let (attempt, mut conn) = self.conn().await?;
        conn.expire::<_, ()>(key, seconds)
            .await
            .map_err(|e| self.fail(attempt, "EXPIRE", e))
    }

    fn name(&self) -> &str {
        "redis"
    }

    fn is_enabled(&self) -> bool {
        self.client.is_some()
    }
}
