//! Estado de aplicacion para tests: store en memoria y upstream falso.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use metrics_exporter_prometheus::PrometheusBuilder;
use parking_lot::Mutex;
use serde_json::{Value, json};
use vigil_core::{Result, VigilError};
use vigil_realtime::Subscription;
use vigil_server::cache::{CacheSettings, ResourceCache};
use vigil_server::upstream::{UpstreamRequest, UpstreamSource};
use vigil_server::{AppState, create_router};
use vigil_store::MemoryStore;

use super::client::TestClient;

/// Upstream que responde con el path, la query y el subject recibidos.
///
/// Los paths que empiezan con `missing` devuelven 404 y los que empiezan con
/// `broken` fallan.
#[derive(Default)]
pub struct EchoUpstream {
    calls: AtomicU32,
    requests: Mutex<Vec<UpstreamRequest>>,
}

impl EchoUpstream {
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<UpstreamRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl UpstreamSource for EchoUpstream {
    async fn fetch(&self, request: &UpstreamRequest) -> Result<Option<Value>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        if request.path.starts_with("missing") {
            return Ok(None);
        }
        if request.path.starts_with("broken") {
            return Err(VigilError::upstream("shop service returned 500"));
        }

        Ok(Some(json!({
            "path": request.path,
            "query": request.query,
            "subject": request.subject,
            "lang": request.accept_language,
        })))
    }

    fn name(&self) -> &str {
        "echo"
    }
}

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub upstream: Arc<EchoUpstream>,
    pub settings: CacheSettings,
    pub subscription: Option<Subscription>,
    pub preview_limit: Option<usize>,
    pub with_upstream: bool,
}

impl TestApp {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            upstream: Arc::new(EchoUpstream::default()),
            settings: CacheSettings::default(),
            subscription: None,
            preview_limit: None,
            with_upstream: true,
        }
    }

    pub fn without_upstream(mut self) -> Self {
        self.with_upstream = false;
        self
    }

    pub fn with_settings(mut self, settings: CacheSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_subscription(mut self, subscription: Subscription) -> Self {
        self.subscription = Some(subscription);
        self
    }

    pub fn with_preview_limit(mut self, preview_limit: usize) -> Self {
        self.preview_limit = Some(preview_limit);
        self
    }

    pub fn state(&self) -> AppState {
        let cache = ResourceCache::new(self.store.clone(), self.settings.clone());
        let mut state = AppState::new(cache);
        if self.with_upstream {
            state = state.with_upstream(self.upstream.clone());
        }
        if let Some(subscription) = &self.subscription {
            state = state.with_subscription(subscription.clone());
        }
        if let Some(preview_limit) = self.preview_limit {
            state = state.with_preview_limit(preview_limit);
        }
        state
    }

    pub fn client(&self) -> TestClient {
        let handle = PrometheusBuilder::new().build_recorder().handle();
        TestClient::new(create_router(self.state(), handle))
    }
}
