//! Invalidation generations per resource.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// Contador por recurso que avanza con cada invalidacion.
///
/// Una carga anota la generacion al empezar; si cambio cuando termina, el
/// valor es anterior a la invalidacion y no se escribe.
#[derive(Debug, Clone, Default)]
pub struct Generations {
    counters: Arc<Mutex<HashMap<String, u64>>>,
}

impl Generations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generacion actual de `scope`. Un scope nunca invalidado esta en 0.
    pub fn current(&self, scope: &str) -> u64 {
        self.counters.lock().get(scope).copied().unwrap_or(0)
    }

    /// Avanza la generacion de `scope` y retorna la nueva.
    pub fn bump(&self, scope: &str) -> u64 {
        let mut counters = self.counters.lock();
        let generation = counters.entry(scope.to_string()).or_default();
        *generation += 1;
        *generation
    }

    pub fn is_current(&self, scope: &str, generation: u64) -> bool {
        self.current(scope) == generation
    }
}
