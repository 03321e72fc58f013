//! HTTP metrics middleware.

use axum::{body::Body, extract::MatchedPath, http::Request, middleware::Next, response::Response};
use metrics::{counter, histogram};
use std::time::Instant;

use crate::handlers::proxy::CACHE_STATUS_HEADER;

/// Middleware que registra metricas HTTP para cada request.
///
/// El label `path` usa la ruta registrada (`/cache/{domain}/{resource}`) y no
/// la URI concreta, para no crear una serie por cada id.
pub async fn http_metrics_middleware(
    matched_path: Option<MatchedPath>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = matched_path
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();

    // Solo el proxy marca sus respuestas
    if let Some(cache) = response
        .headers()
        .get(CACHE_STATUS_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        counter!("vigil_http_cached_responses_total", "cache" => cache.to_string()).increment(1);
    }

    counter!(
        "vigil_http_requests_total",
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status
    )
    .increment(1);

    histogram!(
        "vigil_http_request_duration_seconds",
        "method" => method,
        "path" => path
    )
    .record(start.elapsed().as_secs_f64());

    response
}

/// Registra las metricas HTTP
pub fn register_http_metrics() {
    metrics::describe_counter!("vigil_http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "vigil_http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    metrics::describe_counter!(
        "vigil_http_cached_responses_total",
        "Proxied responses by cache outcome (HIT, MISS, JOINED, BYPASS)"
    );
}
