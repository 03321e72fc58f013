//! Vigil Server - response cache and HTTP surface
//!
//! This crate provides the read-through response cache that sits in front of
//! the upstream services, its per-domain façades, and the Axum server that
//! exposes health, metrics, cache invalidation and a cached ecommerce proxy.

pub mod cache;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod server;
pub mod state;
pub mod upstream;

pub use crate::config::ServerConfig;
pub use crate::error::AppError;
pub use crate::metrics::init_metrics;
pub use crate::server::{create_router, run_server};
pub use crate::state::AppState;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_defined() {
        assert!(!version().is_empty());
    }
}
