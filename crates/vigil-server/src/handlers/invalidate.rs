//! Cache invalidation endpoint handlers.

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Serialize;
use tracing::instrument;

use crate::cache::InvalidationResult;
use crate::error::AppError;
use crate::extractors::{CollectionPath, DetailPath};
use crate::state::AppState;

/// Response para operaciones de invalidación.
#[derive(Debug, Serialize)]
pub struct InvalidateResponse {
    /// Número de entries que existían y se borraron.
    pub invalidated: u64,
    /// Keys solicitadas al store.
    pub keys: Vec<String>,
    /// Mensaje descriptivo.
    pub message: String,
}

impl InvalidateResponse {
    fn new(result: InvalidationResult, message: String) -> Self {
        Self {
            invalidated: result.count,
            keys: result.keys,
            message,
        }
    }
}

/// DELETE /cache/{domain}/{resource}
/// Invalida todas las listas y el conteo de un recurso.
#[instrument(skip_all, fields(domain = %path.domain, resource = %path.resource))]
pub async fn invalidate_collection(
    State(state): State<AppState>,
    Path(path): Path<CollectionPath>,
) -> Result<Json<InvalidateResponse>, AppError> {
    let (domain, resource) = path.parse()?;
    let result = state.cache().invalidate_collection(domain, resource).await;

    let message = format!(
        "Invalidated {} cache entries for {}:{}",
        result.count, domain, resource
    );
    Ok(Json(InvalidateResponse::new(result, message)))
}

/// DELETE /cache/{domain}/{resource}/{id}
/// Invalida el detalle de un elemento.
#[instrument(skip_all, fields(
    domain = %path.domain,
    resource = %path.resource,
    id = %path.id
))]
pub async fn invalidate_detail(
    State(state): State<AppState>,
    Path(path): Path<DetailPath>,
) -> Result<Json<InvalidateResponse>, AppError> {
    let (domain, resource, id) = path.parse()?;
    let result = state.cache().invalidate_detail(domain, resource, id).await;

    let message = format!(
        "Invalidated cache entry for {}:{} '{}'",
        domain, resource, id
    );
    Ok(Json(InvalidateResponse::new(result, message)))
}
