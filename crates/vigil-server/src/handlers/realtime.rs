use axum::{Json, extract::State};
use serde::Serialize;
use vigil_realtime::Subscription;

use crate::error::AppError;
use crate::state::AppState;

/// Plantilla de suscripcion mas los limites que aplica el cliente.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    #[serde(flatten)]
    pub subscription: Subscription,
    /// Maximo de previews en la lista local.
    pub preview_limit: usize,
}

/// GET /realtime/subscription
/// Plantilla de suscripcion que los clientes combinan con sus propios datos.
pub async fn get_subscription(
    State(state): State<AppState>,
) -> Result<Json<SubscriptionResponse>, AppError> {
    let subscription = state
        .subscription()
        .cloned()
        .ok_or_else(|| AppError::Unavailable("Realtime hub is not configured".to_string()))?;

    Ok(Json(SubscriptionResponse {
        subscription,
        preview_limit: state.preview_limit(),
    }))
}
