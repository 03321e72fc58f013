use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

/// Valor crudo del header Accept-Language.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Locale(pub Option<String>);

impl Locale {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let lang = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from);

        Ok(Locale(lang))
    }
}
