#![allow(dead_code)]
use vigil_core::{ConversationSummary, RealtimeEvent};

/// Parses an event fixture. Panics if the JSON is invalid (intended for tests).
pub fn event(json: &str) -> RealtimeEvent {
    RealtimeEvent::parse(json).expect("Failed to parse test event")
}

/// Builds a summary with the given id and unread counter.
pub fn summary(id: &str, unread: u32) -> ConversationSummary {
    ConversationSummary::new(id)
        .with_title(format!("Conversation {id}"))
        .with_unread(unread)
}

/// A realistic upsert payload as sent by the hub.
pub fn upsert_payload(event_id: &str, conversation_id: &str) -> String {
    format!(
        r#"{{
            "type": "conversation.updated",
            "eventId": "{event_id}",
            "conversation": {{
                "id": "{conversation_id}",
                "title": "Release planning",
                "lastMessagePreview": "Ship it",
                "updatedAt": "2026-03-01T10:15:00Z",
                "unreadCount": 4,
                "participants": ["u1", "u2"]
            }}
        }}"#
    )
}
