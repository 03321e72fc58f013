use axum::{extract::FromRequestParts, http::request::Parts};
use vigil_core::CallerIdentity;

use crate::upstream::SUBJECT_HEADER;

/// Identidad del llamador, resuelta una vez por request.
///
/// El gateway de sesiones pone el subject en `x-session-subject`; sin header
/// (o con un valor vacio) el llamador es anonimo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity(pub CallerIdentity);

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let subject = parts
            .headers
            .get(SUBJECT_HEADER)
            .and_then(|v| v.to_str().ok());

        Ok(Identity(CallerIdentity::from_subject(subject)))
    }
}
