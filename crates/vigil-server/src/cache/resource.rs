//! Read-through cache over a shared key-value store.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use vigil_core::{CallerIdentity, Domain, Result, VigilError};
use vigil_store::{KeyValueStore, StoreError};

use super::fingerprint::QueryFingerprint;
use super::generation::Generations;
use super::inflight::InFlightRegistry;
use super::keys::{CacheKey, CacheKeyScheme, IndexSetKey};
use super::settings::CacheSettings;
use crate::metrics::CacheMetrics;

/// How a read was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Value found in the store.
    Hit,
    /// Loader called by this request.
    Miss,
    /// Joined a load started by another request.
    Joined,
    /// Caching disabled for the resource.
    Bypass,
}

impl CacheStatus {
    /// Value of the `x-vigil-cache` response header.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
            Self::Joined => "JOINED",
            Self::Bypass => "BYPASS",
        }
    }
}

/// A loaded value together with how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub value: Option<T>,
    pub status: CacheStatus,
}

impl<T> Fetched<T> {
    pub fn new(value: Option<T>, status: CacheStatus) -> Self {
        Self { value, status }
    }

    pub fn into_value(self) -> Option<T> {
        self.value
    }
}

/// Cache de respuestas de upstream respaldado por un [`KeyValueStore`].
///
/// Todas las lecturas siguen el mismo camino:
///
/// 1. TTL <= 0: se llama al loader, sin trafico al store ni deduplicacion.
/// 2. `GET` de la key; un hit devuelve el valor tal cual.
/// 3. En un miss el loader corre a traves del [`InFlightRegistry`]; si devuelve
///    un valor se escribe con `SET .. EX ttl` y las keys de lista/conteo se
///    registran en su IndexSet.
///
/// Los errores del store nunca llegan al llamador: cuentan como miss y se
/// registran en `vigil_cache_store_errors_total`. Los errores del loader se
/// propagan sin cambios y no se cachea nada.
///
/// Una invalidacion avanza la generacion del recurso: las cargas que
/// empezaron antes no escriben su valor y las lecturas posteriores no se
/// unen a ellas.
#[derive(Clone)]
pub struct ResourceCache {
    pub(crate) store: Arc<dyn KeyValueStore>,
    pub(crate) scheme: CacheKeyScheme,
    settings: Arc<CacheSettings>,
    inflight: InFlightRegistry,
    pub(crate) generations: Generations,
    pub(crate) metrics: CacheMetrics,
}

impl ResourceCache {
    pub fn new(store: Arc<dyn KeyValueStore>, settings: CacheSettings) -> Self {
        Self {
            store,
            scheme: CacheKeyScheme::default(),
            settings: Arc::new(settings),
            inflight: InFlightRegistry::new(),
            generations: Generations::new(),
            metrics: CacheMetrics::new(),
        }
    }

    pub fn with_scheme(mut self, scheme: CacheKeyScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    pub fn scheme(&self) -> &CacheKeyScheme {
        &self.scheme
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    pub fn inflight(&self) -> &InFlightRegistry {
        &self.inflight
    }

    /// Reads a list variant identified by the query fingerprint.
    pub async fn fetch_list<F, Fut>(
        &self,
        domain: Domain,
        resource: &str,
        fingerprint: &QueryFingerprint,
        loader: F,
    ) -> Result<Option<Value>>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Option<Value>>> + Send + 'static,
    {
        let key = CacheKey::list(domain, resource, fingerprint);
        Ok(self.fetch(key, loader).await?.into_value())
    }

    /// Reads the size of a collection.
    pub async fn fetch_count<F, Fut>(
        &self,
        domain: Domain,
        resource: &str,
        loader: F,
    ) -> Result<Option<Value>>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Option<Value>>> + Send + 'static,
    {
        let key = CacheKey::count(domain, resource);
        Ok(self.fetch(key, loader).await?.into_value())
    }

    /// Reads one item by id. Details are not tracked in an IndexSet.
    pub async fn fetch_detail<F, Fut>(
        &self,
        domain: Domain,
        resource: &str,
        id: &str,
        loader: F,
    ) -> Result<Option<Value>>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Option<Value>>> + Send + 'static,
    {
        let key = CacheKey::detail(domain, resource, id);
        Ok(self.fetch(key, loader).await?.into_value())
    }

    /// Reads a whole ecommerce upstream response.
    ///
    /// The fingerprint folds in the path, the query, the normalized
    /// `Accept-Language` and the caller identity, so two users never share an
    /// entry.
    pub async fn fetch_response<F, Fut>(
        &self,
        path: &str,
        query: &str,
        accept_language: Option<&str>,
        identity: &CallerIdentity,
        loader: F,
    ) -> Result<Fetched<Value>>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Option<Value>>> + Send + 'static,
    {
        let fingerprint = QueryFingerprint::for_response(path, query, accept_language, identity);
        self.fetch(CacheKey::response(&fingerprint), loader).await
    }

    /// Typed [`fetch_list`](Self::fetch_list).
    pub async fn fetch_list_as<T, F, Fut>(
        &self,
        domain: Domain,
        resource: &str,
        fingerprint: &QueryFingerprint,
        loader: F,
    ) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Option<T>>> + Send + 'static,
    {
        let value = self
            .fetch_list(domain, resource, fingerprint, encoded(loader))
            .await?;
        decoded(value)
    }

    /// Typed [`fetch_count`](Self::fetch_count).
    pub async fn fetch_count_as<T, F, Fut>(
        &self,
        domain: Domain,
        resource: &str,
        loader: F,
    ) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Option<T>>> + Send + 'static,
    {
        let value = self.fetch_count(domain, resource, encoded(loader)).await?;
        decoded(value)
    }

    /// Typed [`fetch_detail`](Self::fetch_detail).
    pub async fn fetch_detail_as<T, F, Fut>(
        &self,
        domain: Domain,
        resource: &str,
        id: &str,
        loader: F,
    ) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Option<T>>> + Send + 'static,
    {
        let value = self
            .fetch_detail(domain, resource, id, encoded(loader))
            .await?;
        decoded(value)
    }

    /// Read-through for an arbitrary key. The TTL comes from the key's domain
    /// and resource.
    pub async fn fetch<F, Fut>(&self, key: CacheKey, loader: F) -> Result<Fetched<Value>>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Option<Value>>> + Send + 'static,
    {
        let domain = key.domain();
        let ttl = self.ttl_for(&key);

        if ttl <= 0 {
            self.metrics.record_bypass(domain);
            debug!(key = %key, "Caching disabled, calling loader");
            let value = loader().await?;
            return Ok(Fetched::new(value, CacheStatus::Bypass));
        }

        let started = Instant::now();
        let rendered = self.scheme.render(&key);

        if let Some(value) = self.read(&rendered).await {
            self.metrics.record_hit(domain);
            self.metrics
                .record_operation_duration(domain, started.elapsed());
            debug!(key = %rendered, "Cache hit");
            return Ok(Fetched::new(Some(value), CacheStatus::Hit));
        }

        self.metrics.record_miss(domain);
        debug!(key = %rendered, "Cache miss");

        let scope = self.scope_of(&key);
        let write = WriteBack {
            store: Arc::clone(&self.store),
            metrics: self.metrics.clone(),
            generations: self.generations.clone(),
            generation: self.generations.current(&scope),
            scope: scope.clone(),
            index: key.index_key().map(|index| self.scheme.render_index(&index)),
            key: rendered.clone(),
            ttl: ttl.unsigned_abs(),
        };

        let (result, joined) = self
            .inflight
            .run_in(&scope, &rendered, move || {
                let load = loader();
                async move {
                    let value = load.await?;
                    if let Some(value) = &value {
                        write.apply(value).await;
                    }
                    Ok(value)
                }
            })
            .await;

        if joined {
            self.metrics.record_inflight_join();
        }
        self.metrics
            .record_operation_duration(domain, started.elapsed());

        let status = if joined {
            CacheStatus::Joined
        } else {
            CacheStatus::Miss
        };
        result.map(|value| Fetched::new(value, status))
    }

    /// TTL in seconds for a key. Responses resolve under `ecommerce.response`.
    pub fn ttl_for(&self, key: &CacheKey) -> i64 {
        self.settings.ttl_for(key.domain(), key.resource())
    }

    /// Scope de invalidacion de un recurso: la key de su IndexSet.
    pub(crate) fn resource_scope(&self, domain: Domain, resource: &str) -> String {
        self.scheme.render_index(&IndexSetKey::new(domain, resource))
    }

    fn scope_of(&self, key: &CacheKey) -> String {
        self.resource_scope(key.domain(), key.resource())
    }

    async fn read(&self, key: &str) -> Option<Value> {
        match self.store.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    debug!(key = %key, error = %e, "Discarding undecodable cached value");
                    None
                },
            },
            Ok(None) => None,
            Err(e) => {
                note_store_error(&self.metrics, "get", &e);
                None
            },
        }
    }
}

/// Escritura de un valor recien cargado; corre dentro de la tarea del loader.
struct WriteBack {
    store: Arc<dyn KeyValueStore>,
    metrics: CacheMetrics,
    generations: Generations,
    /// Generacion del recurso cuando empezo la carga.
    generation: u64,
    scope: String,
    key: String,
    index: Option<String>,
    ttl: u64,
}

impl WriteBack {
    fn is_stale(&self) -> bool {
        !self.generations.is_current(&self.scope, self.generation)
    }

    async fn apply(&self, value: &Value) {
        if self.is_stale() {
            debug!(key = %self.key, "Resource invalidated during load, not caching");
            return;
        }

        self.write(value).await;

        // Una invalidacion entre el chequeo y la escritura pudo no ver la key.
        if self.is_stale() {
            debug!(key = %self.key, "Resource invalidated during write, discarding");
            if let Err(e) = self.store.delete(std::slice::from_ref(&self.key)).await {
                note_store_error(&self.metrics, "del", &e);
            }
        }
    }

    async fn write(&self, value: &Value) {
        let encoded = match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(e) => {
                debug!(key = %self.key, error = %e, "Value not cacheable");
                return;
            },
        };

        if let Err(e) = self.store.set_with_ttl(&self.key, &encoded, self.ttl).await {
            note_store_error(&self.metrics, "set", &e);
            return;
        }

        let Some(index) = &self.index else {
            return;
        };
        if let Err(e) = self.store.add_to_set(index, &self.key).await {
            note_store_error(&self.metrics, "sadd", &e);
            return;
        }
        // El set vive al menos tanto como sus miembros.
        let index_ttl = self.ttl.saturating_mul(2).max(self.ttl);
        if let Err(e) = self.store.expire(index, index_ttl).await {
            note_store_error(&self.metrics, "expire", &e);
        }
    }
}

/// Store failures degrade to a miss. `Disabled` is the normal state of a
/// deployment without a store and is not counted.
pub(crate) fn note_store_error(metrics: &CacheMetrics, operation: &'static str, error: &StoreError) {
    if error.is_disabled() {
        return;
    }
    metrics.record_store_error(operation, error.label());
    debug!(op = operation, kind = error.label(), error = %error, "Key-value store error treated as miss");
}

fn encoded<T, F, Fut>(loader: F) -> impl FnOnce() -> BoxFuture<'static, Result<Option<Value>>> + Send
where
    T: Serialize + Send + 'static,
    F: FnOnce() -> Fut + Send,
    Fut: Future<Output = Result<Option<T>>> + Send + 'static,
{
    move || {
        let load = loader();
        async move {
            match load.await? {
                Some(value) => Ok(Some(serde_json::to_value(value)?)),
                None => Ok(None),
            }
        }
        .boxed()
    }
}

fn decoded<T: DeserializeOwned>(value: Option<Value>) -> Result<Option<T>> {
    value
        .map(serde_json::from_value)
        .transpose()
        .map_err(VigilError::from)
}
