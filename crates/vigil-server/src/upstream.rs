//! Upstream services the cache sits in front of.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url, header};
use serde_json::Value;
use tracing::debug;
use vigil_core::{Result, VigilError};

/// Header con el subject del llamador hacia el upstream.
pub const SUBJECT_HEADER: &str = "x-session-subject";

/// A request forwarded to an upstream service.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpstreamRequest {
    /// Path relative to the service base URL.
    pub path: String,
    /// Raw query string, without `?`.
    pub query: String,
    pub accept_language: Option<String>,
    pub subject: Option<String>,
}

/// A service that answers JSON for a path.
///
/// `Ok(None)` means the resource does not exist; it is never cached.
#[async_trait]
pub trait UpstreamSource: Send + Sync {
    async fn fetch(&self, request: &UpstreamRequest) -> Result<Option<Value>>;

    /// Nombre para logs.
    fn name(&self) -> &str;
}

/// JSON upstream over HTTP.
pub struct HttpUpstream {
    client: Client,
    base_url: Url,
}

impl HttpUpstream {
    /// Creates a client for `base_url`. A trailing `/` is added so relative
    /// paths resolve under it.
    pub fn new(base_url: &str) -> Result<Self> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized)
            .map_err(|e| VigilError::InvalidConfig(format!("upstream url '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(VigilError::InvalidConfig(format!(
                "upstream url '{}' cannot carry a path",
                base_url
            )));
        }

        Ok(Self {
            client: Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// URL final de una request. El path siempre queda debajo de `base_url`.
    pub fn url_for(&self, request: &UpstreamRequest) -> Result<Url> {
        let rejected = || VigilError::upstream(format!("path '{}' leaves the upstream base", request.path));
        let segments = relative_segments(&request.path).ok_or_else(rejected)?;

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| rejected())?
            .pop_if_empty()
            .extend(segments);
        if !request.query.is_empty() {
            url.set_query(Some(&request.query));
        }

        if !url.as_str().starts_with(self.base_url.as_str()) {
            return Err(rejected());
        }
        Ok(url)
    }
}

/// Segmentos de un path relativo al upstream.
///
/// `None` si el path es una URL absoluta o tiene segmentos `.`/`..`. Cada
/// segmento se codifica por separado al armar la URL, asi que un `/`, `?` o
/// `#` dentro de un segmento no cambia la estructura.
pub fn relative_segments(path: &str) -> Option<Vec<&str>> {
    let path = path.trim_start_matches('/');
    if path.contains('\\') || Url::parse(path).is_ok() {
        return None;
    }

    let segments: Vec<&str> = path.split('/').collect();
    if segments.iter().any(|s| matches!(*s, "." | "..")) {
        return None;
    }
    Some(segments)
}

#[async_trait]
impl UpstreamSource for HttpUpstream {
    async fn fetch(&self, request: &UpstreamRequest) -> Result<Option<Value>> {
        let url = self.url_for(request)?;
        debug!(url = %url, "Calling upstream");

        let mut builder = self
            .client
            .get(url.clone())
            .header(header::ACCEPT, "application/json");
        if let Some(lang) = &request.accept_language {
            builder = builder.header(header::ACCEPT_LANGUAGE, lang);
        }
        if let Some(subject) = &request.subject {
            builder = builder.header(SUBJECT_HEADER, subject);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| VigilError::upstream(format!("{}: {}", url, e)))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body = response
                    .json::<Value>()
                    .await
                    .map_err(|e| VigilError::upstream(format!("{}: invalid body: {}", url, e)))?;
                Ok(Some(body))
            },
            status => Err(VigilError::upstream(format!("{} returned {}", url, status))),
        }
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let upstream = HttpUpstream::new("https://shop.internal/api").unwrap();
        assert_eq!(upstream.base_url().as_str(), "https://shop.internal/api/");
    }

    #[test]
    fn test_url_for() {
        let upstream = HttpUpstream::new("https://shop.internal/api/").unwrap();
        let url = upstream
            .url_for(&UpstreamRequest {
                path: "/orders/42".into(),
                query: "expand=items".into(),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(url.as_str(), "https://shop.internal/api/orders/42?expand=items");
    }

    #[test]
    fn test_path_cannot_leave_base() {
        let upstream = HttpUpstream::new("https://shop.internal/api/").unwrap();
        let url_for = |path: &str| {
            upstream.url_for(&UpstreamRequest {
                path: path.into(),
                ..Default::default()
            })
        };

        for path in [
            "http://evil.example/steal",
            "http://evil/..",
            "../x",
            "../../admin/secrets",
            "orders/../../admin",
            "orders/./42",
            "..\\admin",
        ] {
            assert!(
                matches!(url_for(path), Err(VigilError::Upstream { .. })),
                "path {} should be rejected",
                path
            );
        }
    }

    #[test]
    fn test_segments_are_encoded() {
        let upstream = HttpUpstream::new("https://shop.internal/api").unwrap();
        let url = upstream
            .url_for(&UpstreamRequest {
                path: "search/shoes?admin=1#x".into(),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(url.host_str(), Some("shop.internal"));
        assert_eq!(url.path(), "/api/search/shoes%3Fadmin=1%23x");
        assert_eq!(url.query(), None);
    }

    #[test]
    fn test_relative_segments() {
        assert_eq!(relative_segments("/orders/42"), Some(vec!["orders", "42"]));
        assert_eq!(relative_segments("products/"), Some(vec!["products", ""]));
        assert_eq!(relative_segments("a..b/c"), Some(vec!["a..b", "c"]));
        assert_eq!(relative_segments("../x"), None);
        assert_eq!(relative_segments("https://evil.example"), None);
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            HttpUpstream::new("not a url"),
            Err(VigilError::InvalidConfig(_))
        ));
    }
}
