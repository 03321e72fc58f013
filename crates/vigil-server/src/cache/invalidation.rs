//! Cache invalidation through index sets.

use serde::Serialize;
use tracing::info;
use vigil_core::{Domain, Mutation};

use super::keys::{CacheKey, IndexSetKey};
use super::resource::{ResourceCache, note_store_error};

/// Resultado de una operación de invalidación.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InvalidationResult {
    /// Número de keys que existían y se borraron.
    pub count: u64,
    /// Keys solicitadas al store.
    pub keys: Vec<String>,
}

impl InvalidationResult {
    /// Combina dos resultados.
    pub fn merge(mut self, other: InvalidationResult) -> Self {
        self.count += other.count;
        self.keys.extend(other.keys);
        self
    }
}

impl ResourceCache {
    /// Invalida todas las variantes de lista y el conteo de un recurso.
    ///
    /// Avanza la generación del recurso y suelta sus cargas en curso, borra
    /// cada miembro del IndexSet y la key de conteo, y después el IndexSet.
    /// Las lecturas que empiecen después de que esto retorne van al loader.
    ///
    /// # Examples
    ///
    /// ```
    /// # use std::sync::Arc;
    /// # use serde_json::json;
    /// # use vigil_core::Domain;
    /// # use vigil_server::cache::{CacheSettings, QueryFingerprint, ResourceCache};
    /// # use vigil_store::MemoryStore;
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let cache = ResourceCache::new(Arc::new(MemoryStore::new()), CacheSettings::default());
    /// let fp = QueryFingerprint::from_query_string("page=1");
    /// cache
    ///     .fetch_list(Domain::Blog, "post", &fp, || async { Ok(Some(json!([]))) })
    ///     .await
    ///     .unwrap();
    ///
    /// let result = cache.invalidate_collection(Domain::Blog, "post").await;
    /// assert_eq!(result.count, 1);
    /// # }
    /// ```
    pub async fn invalidate_collection(&self, domain: Domain, resource: &str) -> InvalidationResult {
        let index = self.scheme.render_index(&IndexSetKey::new(domain, resource));
        self.generations.bump(&index);
        let detached = self.inflight().forget_scope(&index);

        let mut keys = match self.store.members_of(&index).await {
            Ok(members) => members,
            Err(e) => {
                note_store_error(&self.metrics, "smembers", &e);
                Vec::new()
            },
        };
        let count_key = self.scheme.render(&CacheKey::count(domain, resource));
        if !keys.contains(&count_key) {
            keys.push(count_key);
        }

        let count = self.delete_keys(&keys).await;
        self.delete_keys(std::slice::from_ref(&index)).await;

        self.metrics.record_invalidation("collection");
        info!(
            domain = %domain,
            resource = %resource,
            count = count,
            detached = detached,
            "Cache collection invalidated"
        );

        InvalidationResult { count, keys }
    }

    /// Invalida el detalle de un elemento.
    ///
    /// También avanza la generación del recurso, así que las cargas de listas
    /// en curso tampoco se escriben.
    pub async fn invalidate_detail(&self, domain: Domain, resource: &str, id: &str) -> InvalidationResult {
        let scope = self.resource_scope(domain, resource);
        self.generations.bump(&scope);
        self.inflight().forget_scope(&scope);

        let key = self.scheme.render(&CacheKey::detail(domain, resource, id));
        let keys = vec![key];
        let count = self.delete_keys(&keys).await;

        self.metrics.record_invalidation("detail");
        info!(
            domain = %domain,
            resource = %resource,
            id = %id,
            count = count,
            "Cache detail invalidated"
        );

        InvalidationResult { count, keys }
    }

    /// Invalida lo que deja obsoleto una escritura.
    ///
    /// Un create solo cambia las listas; update y delete también el detalle.
    pub async fn after_mutation(
        &self,
        domain: Domain,
        resource: &str,
        mutation: Mutation,
        id: Option<&str>,
    ) -> InvalidationResult {
        let result = self.invalidate_collection(domain, resource).await;

        match id {
            Some(id) if mutation.touches_detail() => {
                result.merge(self.invalidate_detail(domain, resource, id).await)
            },
            _ => result,
        }
    }

    async fn delete_keys(&self, keys: &[String]) -> u64 {
        match self.store.delete(keys).await {
            Ok(count) => count,
            Err(e) => {
                note_store_error(&self.metrics, "del", &e);
                0
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheSettings, QueryFingerprint};
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use vigil_store::{KeyValueStore, MemoryStore};

    async fn warm(cache: &ResourceCache, fp: &QueryFingerprint, calls: &Arc<AtomicU32>) {
        let calls = Arc::clone(calls);
        cache
            .fetch_list(Domain::Blog, "post", fp, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Some(json!(["p"])))
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_collection_invalidation_forces_reload() {
        let store = Arc::new(MemoryStore::new());
        let cache = ResourceCache::new(store.clone(), CacheSettings::default());
        let calls = Arc::new(AtomicU32::new(0));
        let page1 = QueryFingerprint::from_query_string("page=1");
        let page2 = QueryFingerprint::from_query_string("page=2");

        warm(&cache, &page1, &calls).await;
        warm(&cache, &page2, &calls).await;
        cache
            .fetch_count(Domain::Blog, "post", || async { Ok(Some(json!(2))) })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let result = cache.invalidate_collection(Domain::Blog, "post").await;
        assert_eq!(result.count, 3);
        assert!(result.keys.contains(&"blog:post:count:all".to_string()));
        assert!(!store.contains_key("blog:list_keys:post"));

        warm(&cache, &page1, &calls).await;
        warm(&cache, &page2, &calls).await;
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_collection_invalidation_keeps_details_and_other_resources() {
        let store = Arc::new(MemoryStore::new());
        let cache = ResourceCache::new(store.clone(), CacheSettings::default());
        let calls = Arc::new(AtomicU32::new(0));

        warm(&cache, &QueryFingerprint::from_query_string(""), &calls).await;
        cache
            .fetch_detail(Domain::Blog, "post", "1", || async { Ok(Some(json!({"id": 1}))) })
            .await
            .unwrap();
        cache
            .fetch_count(Domain::Blog, "tag", || async { Ok(Some(json!(9))) })
            .await
            .unwrap();

        cache.invalidate_collection(Domain::Blog, "post").await;

        assert!(store.contains_key("blog:post:detail:1"));
        assert!(store.contains_key("blog:tag:count:all"));
    }

    #[tokio::test]
    async fn test_invalidating_empty_collection() {
        let store = Arc::new(MemoryStore::new());
        let cache = ResourceCache::new(store, CacheSettings::default());

        let result = cache.invalidate_collection(Domain::Admin, "roles").await;

        assert_eq!(result.count, 0);
        assert_eq!(result.keys, vec!["admin:roles:count:all".to_string()]);
    }

    #[tokio::test]
    async fn test_after_mutation() {
        let store = Arc::new(MemoryStore::new());
        let cache = ResourceCache::new(store.clone(), CacheSettings::default());
        store.set_with_ttl("admin:users:detail:7", "{}", 60).await.unwrap();

        let created = cache
            .after_mutation(Domain::Admin, "users", Mutation::Create, Some("7"))
            .await;
        assert!(store.contains_key("admin:users:detail:7"));
        assert_eq!(created.keys.len(), 1);

        let updated = cache
            .after_mutation(Domain::Admin, "users", Mutation::Update, Some("7"))
            .await;
        assert!(!store.contains_key("admin:users:detail:7"));
        assert_eq!(updated.count, 1);
    }

    #[tokio::test]
    async fn test_load_started_before_invalidation_is_not_cached() {
        let store = Arc::new(MemoryStore::new());
        let cache = ResourceCache::new(store.clone(), CacheSettings::default());
        let fp = QueryFingerprint::from_query_string("page=1");
        let calls = Arc::new(AtomicU32::new(0));
        let (release, gate) = tokio::sync::oneshot::channel::<()>();

        let slow = tokio::spawn({
            let cache = cache.clone();
            let fp = fp.clone();
            let calls = Arc::clone(&calls);
            async move {
                cache
                    .fetch_list(Domain::Blog, "post", &fp, move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        let _ = gate.await;
                        Ok(Some(json!(["old"])))
                    })
                    .await
            }
        });
        while cache.inflight().pending() == 0 {
            tokio::task::yield_now().await;
        }

        cache.invalidate_collection(Domain::Blog, "post").await;

        // no se une a la carga anterior
        let fresh = {
            let calls = Arc::clone(&calls);
            cache
                .fetch_list(Domain::Blog, "post", &fp, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Some(json!(["new"])))
                })
                .await
                .unwrap()
        };
        assert_eq!(fresh, Some(json!(["new"])));

        let _ = release.send(());
        assert_eq!(slow.await.unwrap().unwrap(), Some(json!(["old"])));

        let cached = cache
            .fetch_list(Domain::Blog, "post", &fp, || async { Ok(Some(json!(["reloaded"]))) })
            .await
            .unwrap();
        assert_eq!(cached, Some(json!(["new"])));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.inflight().pending(), 0);
    }

    #[tokio::test]
    async fn test_load_finishing_after_invalidation_leaves_no_entry() {
        let store = Arc::new(MemoryStore::new());
        let cache = ResourceCache::new(store.clone(), CacheSettings::default());
        let fp = QueryFingerprint::from_query_string("page=1");
        let (release, gate) = tokio::sync::oneshot::channel::<()>();

        let slow = tokio::spawn({
            let cache = cache.clone();
            let fp = fp.clone();
            async move {
                cache
                    .fetch_list(Domain::Blog, "post", &fp, move || async move {
                        let _ = gate.await;
                        Ok(Some(json!(["old"])))
                    })
                    .await
            }
        });
        while cache.inflight().pending() == 0 {
            tokio::task::yield_now().await;
        }

        cache.invalidate_collection(Domain::Blog, "post").await;
        let _ = release.send(());
        slow.await.unwrap().unwrap();

        assert!(store.is_empty());
        let key = cache.scheme().render(&CacheKey::list(Domain::Blog, "post", &fp));
        assert!(!store.contains_key(&key));
    }

    #[tokio::test]
    async fn test_unavailable_store_invalidates_nothing() {
        let store = Arc::new(MemoryStore::new());
        let cache = ResourceCache::new(store.clone(), CacheSettings::default());
        store.set_available(false);

        let result = cache.invalidate_detail(Domain::Blog, "post", "1").await;

        assert_eq!(result.count, 0);
        assert_eq!(cache.metrics().store_errors(), 1);
    }
}
