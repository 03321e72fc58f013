use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use vigil_core::VigilError;

#[derive(Debug)]
pub enum AppError {
    /// Recurso inexistente en el upstream
    NotFound(String),

    /// Parametros invalidos
    BadRequest(String),

    /// Fallo del upstream, el mensaje se devuelve tal cual
    Upstream(String),

    /// Se necesita un usuario autenticado
    Unauthorized(String),

    /// Funcionalidad no configurada en este despliegue
    Unavailable(String),

    /// Error interno
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "Not Found", msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "Bad Request", msg),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, "Bad Gateway", msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "Unauthorized", msg),
            AppError::Unavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable", msg)
            },
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
                msg,
            ),
        };

        let body = Json(ErrorResponse {
            error: error.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

impl From<VigilError> for AppError {
    fn from(err: VigilError) -> Self {
        match err {
            VigilError::Upstream { message } => AppError::Upstream(message),
            VigilError::AuthenticationRequired { message } => AppError::Unauthorized(message),
            VigilError::UnknownDomain(_) => AppError::BadRequest(err.to_string()),
            other => {
                tracing::error!(error = %other, "Request failed");
                AppError::Internal("internal error".to_string())
            },
        }
    }
}
