use axum::{Json, extract::State};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    /// Nombre del key-value store.
    pub store: String,
    /// `false` si la cache esta deshabilitada.
    pub store_enabled: bool,
}

/// El servicio responde UP aunque el store este caido: la cache degrada a
/// leer del upstream.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = state.cache().store();

    Json(HealthResponse {
        status: "UP".to_string(),
        store: store.name().to_string(),
        store_enabled: store.is_enabled(),
    })
}
