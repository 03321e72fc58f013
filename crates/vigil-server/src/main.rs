//! Vigil server binary.

use anyhow::Context;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use vigil_server::{AppState, ServerConfig, init_metrics, run_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::load().context("failed to load configuration")?;
    let addr = config.socket_addr()?;

    tracing::info!("Starting Vigil server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        default_ttl = config.cache.default_ttl_seconds,
        key_prefix = ?config.store.key_prefix,
        "Cache configured"
    );

    let prometheus_handle = init_metrics().context("failed to install metrics recorder")?;
    let state = AppState::from_config(&config)?;

    run_server(addr, state, prometheus_handle).await?;

    Ok(())
}
