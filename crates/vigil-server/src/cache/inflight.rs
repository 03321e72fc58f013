//! Process-local de-duplication of concurrent loads.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;
use vigil_core::VigilError;

/// Result shared by every caller waiting on the same key.
pub type LoadResult = Result<Option<Value>, VigilError>;

type SharedLoad = Shared<BoxFuture<'static, LoadResult>>;

struct Pending {
    id: u64,
    scope: String,
    load: SharedLoad,
}

type PendingMap = Arc<Mutex<HashMap<String, Pending>>>;

/// Mapa de cargas pendientes por key.
///
/// La primera tarea que pide una key registra el handle y lanza la carga en
/// una tarea propia; las siguientes esperan ese mismo handle. La entrada se
/// elimina al terminar la carga, con exito, error o panic, o antes con
/// [`forget_scope`](Self::forget_scope).
#[derive(Clone, Default)]
pub struct InFlightRegistry {
    pending: PendingMap,
    next_id: Arc<AtomicU64>,
}

/// Quita la entrada del mapa cuando la tarea de carga termina, salvo que ya
/// la haya reemplazado otra carga.
struct PendingGuard {
    pending: PendingMap,
    key: String,
    id: u64,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        let mut pending = self.pending.lock();
        if pending.get(&self.key).is_some_and(|entry| entry.id == self.id) {
            pending.remove(&self.key);
        }
    }
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the load built by `start` unless one is already pending for `key`.
    ///
    /// Returns the result and whether this caller joined an existing load.
    /// `start` is only called by the caller that ends up running the load.
    /// The load runs on its own task, so dropping this future does not cancel
    /// it.
    pub async fn run<F, Fut>(&self, key: &str, start: F) -> (LoadResult, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = LoadResult> + Send + 'static,
    {
        self.run_in(key, key, start).await
    }

    /// Like [`run`](Self::run), registering the load under `scope` so
    /// [`forget_scope`](Self::forget_scope) can detach it.
    pub async fn run_in<F, Fut>(&self, scope: &str, key: &str, start: F) -> (LoadResult, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = LoadResult> + Send + 'static,
    {
        let (load, joined) = {
            let mut pending = self.pending.lock();
            match pending.get(key) {
                Some(existing) => (existing.load.clone(), true),
                None => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let guard = PendingGuard {
                        pending: Arc::clone(&self.pending),
                        key: key.to_string(),
                        id,
                    };
                    let fut = start();
                    let task = tokio::spawn(async move {
                        let _guard = guard;
                        fut.await
                    });
                    let load = async move {
                        match task.await {
                            Ok(result) => result,
                            Err(e) => Err(VigilError::upstream(format!("loader task failed: {}", e))),
                        }
                    }
                    .boxed()
                    .shared();
                    pending.insert(
                        key.to_string(),
                        Pending {
                            id,
                            scope: scope.to_string(),
                            load: load.clone(),
                        },
                    );
                    (load, false)
                },
            }
        };

        if joined {
            debug!(key = %key, "Joining in-flight load");
        }
        (load.await, joined)
    }

    /// Number of keys currently loading.
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.pending.lock().contains_key(key)
    }

    /// Detaches every pending load of `scope`. Callers already waiting keep
    /// their result; later callers start a new load.
    pub fn forget_scope(&self, scope: &str) -> usize {
        let mut pending = self.pending.lock();
        let before = pending.len();
        pending.retain(|_, entry| entry.scope != scope);
        before - pending.len()
    }
}
