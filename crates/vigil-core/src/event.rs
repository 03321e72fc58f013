//! Push events received from the realtime hub.
//!
//! Messages are JSON objects discriminated by a `type` field:
//!
//! | `type` | variant |
//! |--------|---------|
//! | `conversation.created`, `conversation.updated` | [`RealtimeEvent::Upsert`] |
//! | `conversation.unread` | [`RealtimeEvent::CounterChanged`] |
//! | `conversation.deleted` | [`RealtimeEvent::Deleted`] |
//! | anything else | [`RealtimeEvent::Unrecognized`] |

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, VigilError};
use crate::summary::ConversationSummary;

/// A decoded push event.
#[derive(Debug, Clone, PartialEq)]
pub enum RealtimeEvent {
    /// A conversation was created or touched.
    Upsert {
        event_id: Option<String>,
        conversation: ConversationSummary,
    },
    /// A conversation's unread counter changed.
    CounterChanged {
        event_id: Option<String>,
        conversation_id: String,
        unread_count: u32,
    },
    /// A conversation was removed.
    Deleted {
        event_id: Option<String>,
        conversation_id: String,
    },
    /// An event kind this client does not know. Safe to ignore.
    Unrecognized {
        event_id: Option<String>,
        kind: String,
    },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    event_id: Option<String>,
}

#[derive(Deserialize)]
struct UpsertBody {
    conversation: ConversationSummary,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CounterBody {
    conversation_id: String,
    unread_count: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeletedBody {
    conversation_id: String,
}

impl RealtimeEvent {
    /// Decodes one message body.
    ///
    /// # Errors
    ///
    /// `MalformedEvent` when the body is not a JSON object with a string `type`,
    /// or when a known kind is missing its fields.
    pub fn parse(data: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(data)
            .map_err(|e| VigilError::malformed_event(format!("invalid JSON: {e}")))?;
        let envelope = Envelope::deserialize(&value)
            .map_err(|e| VigilError::malformed_event(format!("missing event type: {e}")))?;
        let event_id = envelope.event_id.filter(|id| !id.is_empty());

        let event = match envelope.kind.as_str() {
            "conversation.created" | "conversation.updated" => {
                let body = decode::<UpsertBody>(&value, &envelope.kind)?;
                Self::Upsert {
                    event_id,
                    conversation: body.conversation,
                }
            },
            "conversation.unread" => {
                let body = decode::<CounterBody>(&value, &envelope.kind)?;
                Self::CounterChanged {
                    event_id,
                    conversation_id: body.conversation_id,
                    unread_count: body.unread_count,
                }
            },
            "conversation.deleted" => {
                let body = decode::<DeletedBody>(&value, &envelope.kind)?;
                Self::Deleted {
                    event_id,
                    conversation_id: body.conversation_id,
                }
            },
            _ => Self::Unrecognized {
                event_id,
                kind: envelope.kind,
            },
        };

        Ok(event)
    }

    /// Returns the event id, if the hub supplied one.
    pub fn event_id(&self) -> Option<&str> {
        match self {
            Self::Upsert { event_id, .. }
            | Self::CounterChanged { event_id, .. }
            | Self::Deleted { event_id, .. }
            | Self::Unrecognized { event_id, .. } => event_id.as_deref(),
        }
    }

    /// Fills the event id from the transport frame when the body had none.
    pub fn with_fallback_id(mut self, id: Option<&str>) -> Self {
        let slot = match &mut self {
            Self::Upsert { event_id, .. }
            | Self::CounterChanged { event_id, .. }
            | Self::Deleted { event_id, .. }
            | Self::Unrecognized { event_id, .. } => event_id,
        };
        if slot.is_none() {
            *slot = id.filter(|id| !id.is_empty()).map(String::from);
        }
        self
    }

    /// Short name used in logs.
    pub fn kind(&self) -> &str {
        match self {
            Self::Upsert { .. } => "upsert",
            Self::CounterChanged { .. } => "counter-changed",
            Self::Deleted { .. } => "deleted",
            Self::Unrecognized { kind, .. } => kind,
        }
    }
}

fn decode<T: for<'de> Deserialize<'de>>(value: &Value, kind: &str) -> Result<T> {
    T::deserialize(value).map_err(|e| VigilError::malformed_event(format!("{kind}: {e}")))
}
