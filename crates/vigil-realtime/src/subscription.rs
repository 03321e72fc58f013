//! Subscription parameters for the push-event hub.

use std::time::Duration;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use url::Url;
use vigil_core::{Result, VigilError};

/// Reconnect delay used when neither the subscription nor the hub advises one.
pub const DEFAULT_RETRY: Duration = Duration::from_millis(5000);

/// Everything needed to open a push-event connection.
///
/// `topics` may still contain placeholders at this point; the engine expands
/// them before connecting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(default)]
    pub hub_url: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_credentials: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_ms: Option<u64>,
}

impl Subscription {
    /// Creates a subscription for a hub and topic list.
    pub fn new<I, S>(hub_url: impl Into<String>, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hub_url: hub_url.into(),
            topics: topics.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Sets the access token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the reconnect delay in milliseconds.
    pub fn with_retry_ms(mut self, retry_ms: u64) -> Self {
        self.retry_ms = Some(retry_ms);
        self
    }

    /// Merges a locally configured template with values supplied at runtime.
    ///
    /// Topics come from the template when it has any, otherwise from the
    /// fallback. The hub URL, token, credentials flag and retry delay of the
    /// fallback override the template's when present.
    pub fn merge(template: &Subscription, fallback: Option<&Subscription>) -> Subscription {
        let Some(fallback) = fallback else {
            return Subscription {
                topics: unique_topics(&template.topics),
                ..template.clone()
            };
        };

        let template_topics = unique_topics(&template.topics);
        let topics = if template_topics.is_empty() {
            unique_topics(&fallback.topics)
        } else {
            template_topics
        };

        let hub_url = if fallback.hub_url.trim().is_empty() {
            template.hub_url.clone()
        } else {
            fallback.hub_url.clone()
        };

        Subscription {
            hub_url,
            topics,
            token: fallback.token.clone().or_else(|| template.token.clone()),
            with_credentials: fallback.with_credentials.or(template.with_credentials),
            retry_ms: fallback.retry_ms.or(template.retry_ms),
        }
    }

    /// True when there is a hub to connect to and at least one topic.
    pub fn is_connectable(&self) -> bool {
        !self.hub_url.trim().is_empty() && self.topics.iter().any(|t| !t.trim().is_empty())
    }

    /// Whether cookies should accompany the connection.
    pub fn sends_credentials(&self) -> bool {
        self.with_credentials.unwrap_or(false)
    }

    /// Delay before reconnecting, when configured.
    pub fn retry_delay(&self) -> Option<Duration> {
        self.retry_ms.map(Duration::from_millis)
    }

    /// Builds the hub URL with one `topic` parameter per topic and the
    /// optional `access_token`.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` when the hub URL does not parse.
    pub fn connect_url(&self) -> Result<Url> {
        let mut url = Url::parse(self.hub_url.trim()).map_err(|e| {
            VigilError::InvalidConfig(format!("invalid hub URL '{}': {}", self.hub_url, e))
        })?;

        {
            let mut query = url.query_pairs_mut();
            for topic in self.topics.iter().filter(|t| !t.trim().is_empty()) {
                query.append_pair("topic", topic);
            }
            if let Some(token) = self.token.as_deref().filter(|t| !t.is_empty()) {
                query.append_pair("access_token", token);
            }
        }

        Ok(url)
    }
}

fn unique_topics(topics: &[String]) -> Vec<String> {
    topics
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_prefers_template_topics() {
        let template = Subscription::new("https://hub.local/events", ["user/{userId}"]);
        let fallback = Subscription::new("", ["other"]).with_token("t-1");

        let merged = Subscription::merge(&template, Some(&fallback));

        assert_eq!(merged.topics, vec!["user/{userId}"]);
        assert_eq!(merged.hub_url, "https://hub.local/events");
        assert_eq!(merged.token.as_deref(), Some("t-1"));
    }

    #[test]
    fn test_merge_falls_back_to_runtime_topics() {
        let template = Subscription::new("https://hub.local/events", [" ", ""]).with_retry_ms(1000);
        let fallback = Subscription::new("https://push.example.com/hub", ["a", "b", "a"]);

        let merged = Subscription::merge(&template, Some(&fallback));

        assert_eq!(merged.topics, vec!["a", "b"]);
        assert_eq!(merged.hub_url, "https://push.example.com/hub");
        assert_eq!(merged.retry_delay(), Some(Duration::from_millis(1000)));
    }

    #[test]
    fn test_connectable() {
        assert!(Subscription::new("https://hub.local", ["t"]).is_connectable());
        assert!(!Subscription::new("https://hub.local", [" "]).is_connectable());
        assert!(!Subscription::new("", ["t"]).is_connectable());
    }

    #[test]
    fn test_connect_url_repeats_topics() {
        let sub = Subscription::new("https://hub.local/events", ["user/u1", "conv/c 1"])
            .with_token("abc");

        let url = sub.connect_url().unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        assert_eq!(
            pairs,
            vec![
                ("topic".to_string(), "user/u1".to_string()),
                ("topic".to_string(), "conv/c 1".to_string()),
                ("access_token".to_string(), "abc".to_string()),
            ]
        );
    }

    #[test]
    fn test_connect_url_rejects_garbage() {
        let sub = Subscription::new("not a url", ["t"]);
        assert!(matches!(sub.connect_url(), Err(VigilError::InvalidConfig(_))));
    }

    #[test]
    fn test_deserialize_camel_case() {
        let sub: Subscription = serde_json::from_str(
            r#"{"hubUrl":"https://hub.local","topics":["t"],"withCredentials":true,"retryMs":250}"#,
        )
        .unwrap();

        assert!(sub.sends_credentials());
        assert_eq!(sub.retry_ms, Some(250));
        assert!(sub.token.is_none());
    }
}
