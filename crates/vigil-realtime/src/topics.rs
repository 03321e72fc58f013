//! Topic template expansion.
//!
//! A topic may contain `{userId}` and `{conversationId}`. A topic needing a
//! user is dropped while no user is known; a topic needing a conversation is
//! repeated once per visible conversation and dropped when none are visible.

use indexmap::IndexSet;

pub const USER_PLACEHOLDER: &str = "{userId}";
pub const CONVERSATION_PLACEHOLDER: &str = "{conversationId}";

/// Runtime values the placeholders resolve to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicContext {
    pub user_id: Option<String>,
    pub conversation_ids: Vec<String>,
}

impl TopicContext {
    pub fn new<I, S>(user_id: Option<&str>, conversation_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            user_id: user_id
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_string),
            conversation_ids: conversation_ids.into_iter().map(Into::into).collect(),
        }
    }
}

/// Expands every template against `context`.
///
/// The result keeps first-occurrence order and holds no duplicates.
pub fn expand_topics(templates: &[String], context: &TopicContext) -> Vec<String> {
    let mut topics = IndexSet::new();

    for template in templates.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        let with_user = if template.contains(USER_PLACEHOLDER) {
            match context.user_id.as_deref() {
                Some(user_id) => template.replace(USER_PLACEHOLDER, user_id),
                None => continue,
            }
        } else {
            template.to_string()
        };

        if with_user.contains(CONVERSATION_PLACEHOLDER) {
            for id in context.conversation_ids.iter().filter(|id| !id.is_empty()) {
                topics.insert(with_user.replace(CONVERSATION_PLACEHOLDER, id));
            }
        } else {
            topics.insert(with_user);
        }
    }

    topics.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn templates() -> Vec<String> {
        vec!["user/{userId}".to_string(), "conv/{conversationId}".to_string()]
    }

    #[test]
    fn test_expands_user_and_conversations() {
        let ctx = TopicContext::new(Some("u1"), ["c1", "c2"]);
        assert_eq!(
            expand_topics(&templates(), &ctx),
            vec!["user/u1", "conv/c1", "conv/c2"]
        );
    }

    #[test]
    fn test_drops_user_topic_without_user() {
        let ctx = TopicContext::new(None, ["c1", "c2"]);
        assert_eq!(expand_topics(&templates(), &ctx), vec!["conv/c1", "conv/c2"]);
    }

    #[test]
    fn test_drops_conversation_topic_without_conversations() {
        let ctx = TopicContext::new(Some("u1"), Vec::<String>::new());
        assert_eq!(expand_topics(&templates(), &ctx), vec!["user/u1"]);
    }

    #[test]
    fn test_cross_product_and_dedup() {
        let templates = vec![
            "inbox/{userId}/{conversationId}".to_string(),
            "global".to_string(),
            "global".to_string(),
        ];
        let ctx = TopicContext::new(Some("u1"), ["c1", "c2", "c1"]);

        assert_eq!(
            expand_topics(&templates, &ctx),
            vec!["inbox/u1/c1", "inbox/u1/c2", "global"]
        );
    }

    #[test]
    fn test_blank_user_is_unknown() {
        let ctx = TopicContext::new(Some("  "), ["c1"]);
        assert!(ctx.user_id.is_none());
    }
}
