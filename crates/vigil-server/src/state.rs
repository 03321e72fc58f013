//! Application state.

use std::sync::Arc;

use tracing::info;
use vigil_core::{Result, VigilError};
use vigil_realtime::Subscription;
use vigil_realtime::projector::DEFAULT_PREVIEW_LIMIT;
use vigil_store::{KeyValueStore, RedisStore};

use crate::cache::{EcommerceCache, ResourceCache};
use crate::config::ServerConfig;
use crate::upstream::{HttpUpstream, UpstreamSource};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    cache: ResourceCache,
    /// Upstream de ecommerce detras de `/proxy/ecommerce`.
    upstream: Option<Arc<dyn UpstreamSource>>,
    /// Plantilla de suscripcion para los clientes.
    subscription: Option<Subscription>,
    /// Maximo de previews que un cliente mantiene en su lista.
    preview_limit: usize,
}

impl AppState {
    /// Creates a state with only the cache configured.
    pub fn new(cache: ResourceCache) -> Self {
        Self {
            cache,
            upstream: None,
            subscription: None,
            preview_limit: DEFAULT_PREVIEW_LIMIT,
        }
    }

    /// Builds the state described by a configuration.
    ///
    /// Without `store.url` the cache runs against a disabled store and every
    /// read goes to the upstream.
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        let store: Arc<dyn KeyValueStore> = match config.store.redis() {
            Some(redis) => {
                info!(url = %redis.url, "Using shared key-value store");
                Arc::new(
                    RedisStore::open(redis)
                        .map_err(|e| VigilError::InvalidConfig(e.to_string()))?,
                )
            },
            None => {
                info!("No key-value store configured, caching disabled");
                Arc::new(RedisStore::disabled())
            },
        };

        let cache = ResourceCache::new(store, config.cache.clone())
            .with_scheme(config.store.key_scheme());
        let mut state = Self::new(cache).with_preview_limit(config.realtime.preview_limit);

        if let Some(base_url) = &config.upstream.ecommerce_base_url {
            state = state.with_upstream(Arc::new(HttpUpstream::new(base_url)?));
        }
        if let Some(subscription) = config.realtime.subscription() {
            state = state.with_subscription(subscription);
        }

        Ok(state)
    }

    pub fn with_upstream(mut self, upstream: Arc<dyn UpstreamSource>) -> Self {
        self.upstream = Some(upstream);
        self
    }

    pub fn with_subscription(mut self, subscription: Subscription) -> Self {
        self.subscription = Some(subscription);
        self
    }

    pub fn with_preview_limit(mut self, preview_limit: usize) -> Self {
        self.preview_limit = preview_limit;
        self
    }

    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    pub fn ecommerce(&self) -> EcommerceCache {
        self.cache.ecommerce()
    }

    pub fn upstream(&self) -> Option<&Arc<dyn UpstreamSource>> {
        self.upstream.as_ref()
    }

    pub fn subscription(&self) -> Option<&Subscription> {
        self.subscription.as_ref()
    }

    pub fn preview_limit(&self) -> usize {
        self.preview_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_default_config() {
        let state = AppState::from_config(&ServerConfig::default()).unwrap();

        assert!(!state.cache().store().is_enabled());
        assert!(state.upstream().is_none());
        assert!(state.subscription().is_none());
        assert_eq!(state.preview_limit(), DEFAULT_PREVIEW_LIMIT);
    }

    #[test]
    fn test_from_config_with_preview_limit() {
        let config = ServerConfig::from_toml("[realtime]\npreview_limit = 5\n").unwrap();

        let state = AppState::from_config(&config).unwrap();
        assert_eq!(state.preview_limit(), 5);
    }

    #[test]
    fn test_from_config_with_upstream() {
        let config = ServerConfig::from_toml(
            "[upstream]\necommerce_base_url = \"http://shop:8000\"\n",
        )
        .unwrap();

        let state = AppState::from_config(&config).unwrap();
        assert_eq!(state.upstream().unwrap().name(), "http");
    }
}
