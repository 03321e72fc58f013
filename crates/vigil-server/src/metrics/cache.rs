//! Cache metrics recording.

use metrics::{counter, histogram};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use vigil_core::Domain;

/// Registra las metricas de cache.
/// Llamar una vez al inicio para registrar las metricas.
pub fn register_cache_metrics() {
    metrics::describe_counter!("vigil_cache_hits_total", "Total number of cache hits");
    metrics::describe_counter!("vigil_cache_misses_total", "Total number of cache misses");
    metrics::describe_counter!(
        "vigil_cache_bypass_total",
        "Reads served straight from the loader because caching is disabled"
    );
    metrics::describe_counter!(
        "vigil_cache_store_errors_total",
        "Key-value store failures absorbed as cache misses"
    );
    metrics::describe_counter!(
        "vigil_cache_invalidations_total",
        "Total number of invalidation calls"
    );
    metrics::describe_counter!(
        "vigil_cache_inflight_joins_total",
        "Reads that joined a load already in flight"
    );
    metrics::describe_histogram!(
        "vigil_cache_operation_seconds",
        "Time spent on read-through operations"
    );
}

/// Recorder de metricas de cache.
/// Usa atomic counters internos para `hit_rate()`; el resto va al recorder global.
#[derive(Debug, Clone, Default)]
pub struct CacheMetrics {
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    store_errors: Arc<AtomicU64>,
    store_errors_by_kind: Arc<Mutex<HashMap<&'static str, u64>>>,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra un cache hit
    pub fn record_hit(&self, domain: Domain) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        counter!("vigil_cache_hits_total", "domain" => domain.as_str()).increment(1);
    }

    /// Registra un cache miss
    pub fn record_miss(&self, domain: Domain) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        counter!("vigil_cache_misses_total", "domain" => domain.as_str()).increment(1);
    }

    /// Lectura con TTL <= 0, directo al loader
    pub fn record_bypass(&self, domain: Domain) {
        counter!("vigil_cache_bypass_total", "domain" => domain.as_str()).increment(1);
    }

    /// Fallo del store absorbido como miss
    /// Registra un fallo del store por operacion (`get`, `set`, ...) y tipo
    /// (`unavailable`, `command`).
    pub fn record_store_error(&self, operation: &'static str, kind: &'static str) {
        self.store_errors.fetch_add(1, Ordering::Relaxed);
        *self.store_errors_by_kind.lock().entry(kind).or_default() += 1;
        counter!("vigil_cache_store_errors_total", "op" => operation, "kind" => kind).increment(1);
    }

    pub fn record_invalidation(&self, kind: &'static str) {
        counter!("vigil_cache_invalidations_total", "kind" => kind).increment(1);
    }

    pub fn record_inflight_join(&self) {
        counter!("vigil_cache_inflight_joins_total").increment(1);
    }

    /// Registra la duracion de una operacion
    pub fn record_operation_duration(&self, domain: Domain, duration: Duration) {
        histogram!(
            "vigil_cache_operation_seconds",
            "domain" => domain.as_str()
        )
        .record(duration.as_secs_f64());
    }

    /// Calcula hit rate (para logging/debugging)
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed) as f64;
        let misses = self.misses.load(Ordering::Relaxed) as f64;
        let total = hits + misses;
        if total == 0.0 { 0.0 } else { hits / total }
    }

    /// Retorna el numero de hits
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Retorna el numero de misses
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Fallos del store vistos desde el arranque
    pub fn store_errors(&self) -> u64 {
        self.store_errors.load(Ordering::Relaxed)
    }

    /// Fallos del store de un tipo
    pub fn store_errors_of(&self, kind: &str) -> u64 {
        self.store_errors_by_kind.lock().get(kind).copied().unwrap_or(0)
    }
}
