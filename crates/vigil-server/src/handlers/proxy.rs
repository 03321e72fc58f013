//! Cached proxy to the ecommerce upstream.

use axum::{
    Json,
    extract::{Path, RawQuery, State},
    response::{IntoResponse, Response},
};
use tracing::instrument;

use crate::error::AppError;
use crate::extractors::{Identity, Locale};
use crate::state::AppState;
use crate::upstream::{UpstreamRequest, relative_segments};

/// Header que indica como se sirvio la respuesta (HIT, MISS, JOINED, BYPASS).
pub const CACHE_STATUS_HEADER: &str = "x-vigil-cache";

/// GET /proxy/ecommerce/{*path}
///
/// La respuesta se cachea por path, query, Accept-Language e identidad.
#[instrument(skip_all, fields(path = %path))]
pub async fn proxy_ecommerce(
    State(state): State<AppState>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    Identity(identity): Identity,
    locale: Locale,
) -> Result<Response, AppError> {
    let upstream = state
        .upstream()
        .cloned()
        .ok_or_else(|| AppError::Unavailable("No ecommerce upstream configured".to_string()))?;

    if relative_segments(&path).is_none() {
        return Err(AppError::BadRequest(format!("Invalid upstream path '{}'", path)));
    }

    let query = query.unwrap_or_default();
    let request = UpstreamRequest {
        path: path.clone(),
        query: query.clone(),
        accept_language: locale.0.clone(),
        subject: identity.subject().map(String::from),
    };

    let fetched = state
        .ecommerce()
        .fetch_response(&path, &query, locale.as_deref(), &identity, move || async move {
            upstream.fetch(&request).await
        })
        .await?;

    match fetched.value {
        Some(body) => {
            Ok(([(CACHE_STATUS_HEADER, fetched.status.as_str())], Json(body)).into_response())
        },
        None => Err(AppError::NotFound(format!(
            "Upstream has no resource at /{}",
            path
        ))),
    }
}
