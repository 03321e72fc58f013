use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::runtime::Runtime;
use vigil_core::{CallerIdentity, Domain};
use vigil_server::cache::{CacheSettings, QueryFingerprint, ResourceCache};
use vigil_store::MemoryStore;

/// Crea una pagina de lista con N elementos
fn create_test_page(num_items: usize) -> Value {
    let items: Vec<Value> = (0..num_items)
        .map(|i| json!({ "id": format!("item-{}", i), "title": format!("Item {}", i) }))
        .collect();
    json!({ "items": items, "total": num_items })
}

fn create_cache() -> ResourceCache {
    ResourceCache::new(Arc::new(MemoryStore::new()), CacheSettings::default())
}

/// Benchmark: fingerprint de queries con distinto numero de parametros
fn bench_fingerprint(c: &mut Criterion) {
    let mut group = c.benchmark_group("fingerprint");

    for num_params in [2, 10, 50] {
        let params: Vec<(String, String)> = (0..num_params)
            .map(|i| (format!("param{}", i), format!("value-{}", i)))
            .collect();

        group.throughput(Throughput::Elements(num_params as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(num_params),
            &params,
            |b, params| {
                b.iter(|| {
                    let fp = QueryFingerprint::of_params(params.iter().map(|(k, v)| (k, v)));
                    std::hint::black_box(fp)
                });
            },
        );
    }

    group.finish();
}

/// Benchmark: fingerprint de una respuesta completa
fn bench_response_fingerprint(c: &mut Criterion) {
    let identity = CallerIdentity::from_subject(Some("user-42"));

    c.bench_function("fingerprint_response", |b| {
        b.iter(|| {
            let fp = QueryFingerprint::for_response(
                "/products/search",
                "q=shoes&page=2&size=20&sort=price",
                Some("es-AR,es;q=0.9"),
                &identity,
            );
            std::hint::black_box(fp)
        });
    });
}

/// Benchmark: lectura de lista cacheada (hit)
fn bench_fetch_list_hit(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("fetch_list_hit");

    for num_items in [10, 100, 1000] {
        let cache = create_cache();
        let fingerprint = QueryFingerprint::of_params([("page", "1")]);
        let page = create_test_page(num_items);

        // Pre-populate cache
        rt.block_on(async {
            let page = page.clone();
            cache
                .fetch_list(Domain::Blog, "post", &fingerprint, move || async move {
                    Ok(Some(page))
                })
                .await
                .unwrap();
        });

        group.throughput(Throughput::Elements(num_items as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(num_items),
            &num_items,
            |b, _| {
                b.to_async(&rt).iter(|| async {
                    let result = cache
                        .fetch_list(Domain::Blog, "post", &fingerprint, || async {
                            Ok(None)
                        })
                        .await;
                    std::hint::black_box(result)
                });
            },
        );
    }

    group.finish();
}

/// Benchmark: invalidacion de una coleccion con varias paginas
fn bench_invalidate_collection(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let cache = create_cache();
    let page = create_test_page(10);

    c.bench_function("invalidate_collection", |b| {
        b.to_async(&rt).iter(|| {
            let cache = cache.clone();
            let page = page.clone();
            async move {
                for i in 0..20 {
                    let fingerprint = QueryFingerprint::of_params([("page", i.to_string())]);
                    let page = page.clone();
                    let _ = cache
                        .fetch_list(Domain::Admin, "users", &fingerprint, move || async move {
                            Ok(Some(page))
                        })
                        .await;
                }
                std::hint::black_box(cache.invalidate_collection(Domain::Admin, "users").await)
            }
        });
    });
}

criterion_group!(
    benches,
    bench_fingerprint,
    bench_response_fingerprint,
    bench_fetch_list_hit,
    bench_invalidate_collection,
);
criterion_main!(benches);
