//! Server configuration.
//!
//! Sources, later ones win:
//!
//! 1. the file named by `VIGIL_CONFIG` (TOML, YAML or JSON by extension), if set;
//! 2. environment variables `VIGIL__<SECTION>__<KEY>`, for example
//!    `VIGIL__STORE__URL` or `VIGIL__CACHE__DOMAINS__BLOG`.
//!
//! `VIGIL__REALTIME__TOPICS` takes a comma-separated list.

use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use vigil_core::{Result, VigilError};
use vigil_realtime::Subscription;
use vigil_store::RedisStoreConfig;

use crate::cache::{CacheKeyScheme, CacheSettings};

/// Variable con la ruta del archivo de configuracion.
pub const CONFIG_PATH_ENV: &str = "VIGIL_CONFIG";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ServerSection,
    pub store: StoreSection,
    pub cache: CacheSettings,
    pub upstream: UpstreamSection,
    pub realtime: RealtimeSection,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Store compartido. Sin `url` la cache queda deshabilitada y todo va al
/// upstream.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreSection {
    pub url: Option<String>,
    pub key_prefix: Option<String>,
    pub connect_timeout_ms: u64,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            url: None,
            key_prefix: None,
            connect_timeout_ms: 5000,
        }
    }
}

impl StoreSection {
    /// Redis settings, `None` when no store is configured.
    pub fn redis(&self) -> Option<RedisStoreConfig> {
        let url = self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())?;
        let mut config = RedisStoreConfig::new(url);
        config.connect_timeout = Duration::from_millis(self.connect_timeout_ms);
        Some(config)
    }

    pub fn key_scheme(&self) -> CacheKeyScheme {
        CacheKeyScheme::new(self.key_prefix.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpstreamSection {
    pub ecommerce_base_url: Option<String>,
}

/// Plantilla de suscripcion que se entrega a los clientes.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RealtimeSection {
    pub hub_url: Option<String>,
    pub topics: Vec<String>,
    pub retry_ms: Option<u64>,
    pub preview_limit: usize,
}

impl Default for RealtimeSection {
    fn default() -> Self {
        Self {
            hub_url: None,
            topics: Vec::new(),
            retry_ms: None,
            preview_limit: vigil_realtime::projector::DEFAULT_PREVIEW_LIMIT,
        }
    }
}

impl RealtimeSection {
    /// Subscription template, `None` without a hub.
    pub fn subscription(&self) -> Option<Subscription> {
        let hub = self.hub_url.as_deref().map(str::trim).filter(|h| !h.is_empty())?;
        let subscription = Subscription::new(hub, self.topics.iter().map(|t| t.trim().to_string()));
        Some(match self.retry_ms {
            Some(ms) => subscription.with_retry_ms(ms),
            None => subscription,
        })
    }
}

impl ServerConfig {
    /// Loads the file named by `VIGIL_CONFIG` (if any) and the environment.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).ok();
        Self::load_from(path.as_deref().map(Path::new))
    }

    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix("VIGIL")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("realtime.topics"),
        );

        let config: ServerConfig = builder
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| VigilError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML document, ignoring the environment.
    pub fn from_toml(source: &str) -> Result<Self> {
        let config: ServerConfig = Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| VigilError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.host_ip()?;

        let unknown = self.cache.unknown_domains();
        if !unknown.is_empty() {
            return Err(VigilError::InvalidConfig(format!(
                "unknown cache domains: {}",
                unknown.join(", ")
            )));
        }

        if self.realtime.preview_limit == 0 {
            return Err(VigilError::InvalidConfig(
                "realtime.preview_limit must be greater than zero".to_string(),
            ));
        }
        if let Some(subscription) = self.realtime.subscription() {
            subscription.connect_url()?;
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(SocketAddr::new(self.host_ip()?, self.server.port))
    }

    fn host_ip(&self) -> Result<IpAddr> {
        self.server.host.trim().parse().map_err(|_| {
            VigilError::InvalidConfig(format!("server.host '{}' is not an IP address", self.server.host))
        })
    }
}
