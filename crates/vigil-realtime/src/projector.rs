//! Applies push events to the local preview list.

use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Utc};
use vigil_core::{ConversationSummary, RealtimeEvent};

/// Default number of previews kept.
pub const DEFAULT_PREVIEW_LIMIT: usize = 20;

/// Default number of event ids remembered for redelivery detection.
pub const RECENT_EVENT_CAPACITY: usize = 128;

/// Returns the preview list after applying `event`.
///
/// - upsert: the entry moves to the front, replacing any previous version;
///   the list is cut to `limit`
/// - counter change: only `unread_count` of a matching entry is touched; an
///   unknown id is ignored
/// - delete: the matching entry is removed, if present
pub fn project(
    previews: &[ConversationSummary],
    event: &RealtimeEvent,
    limit: usize,
) -> Vec<ConversationSummary> {
    match event {
        RealtimeEvent::Upsert { conversation, .. } => {
            let mut next = Vec::with_capacity(previews.len() + 1);
            next.push(conversation.clone());
            next.extend(
                previews
                    .iter()
                    .filter(|p| p.id != conversation.id)
                    .cloned(),
            );
            next.truncate(limit);
            next
        },
        RealtimeEvent::CounterChanged {
            conversation_id,
            unread_count,
            ..
        } => previews
            .iter()
            .map(|p| {
                if &p.id == conversation_id {
                    ConversationSummary {
                        unread_count: *unread_count,
                        ..p.clone()
                    }
                } else {
                    p.clone()
                }
            })
            .collect(),
        RealtimeEvent::Deleted {
            conversation_id, ..
        } => previews
            .iter()
            .filter(|p| &p.id != conversation_id)
            .cloned()
            .collect(),
        RealtimeEvent::Unrecognized { .. } => previews.to_vec(),
    }
}

/// Bounded set of recently seen event ids. Oldest ids are evicted first.
#[derive(Debug, Clone)]
pub struct RecentEventIds {
    capacity: usize,
    order: VecDeque<String>,
    seen: HashSet<String>,
}

impl RecentEventIds {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::new(),
            seen: HashSet::new(),
        }
    }

    /// Records an id. Returns false if it was already present.
    pub fn insert(&mut self, id: &str) -> bool {
        if self.seen.contains(id) {
            return false;
        }
        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        self.order.push_back(id.to_string());
        self.seen.insert(id.to_string());
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.seen.clear();
    }
}

impl Default for RecentEventIds {
    fn default() -> Self {
        Self::new(RECENT_EVENT_CAPACITY)
    }
}

/// The most recent event applied, for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct LastEvent {
    pub event: RealtimeEvent,
    pub received_at: DateTime<Utc>,
}

/// What applying an event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionOutcome {
    /// The preview list changed.
    Changed,
    /// The event was applied but the list is the same.
    Unchanged,
    /// The event id was seen before; nothing happened.
    Duplicate,
    /// The event kind is not handled.
    Ignored,
}

/// Stateful holder of the preview list.
#[derive(Debug, Clone)]
pub struct EventProjector {
    previews: Vec<ConversationSummary>,
    limit: usize,
    recent: RecentEventIds,
    last_event: Option<LastEvent>,
}

impl EventProjector {
    pub fn new(limit: usize) -> Self {
        Self::with_capacity(limit, RECENT_EVENT_CAPACITY)
    }

    pub fn with_capacity(limit: usize, recent_capacity: usize) -> Self {
        Self {
            previews: Vec::new(),
            limit,
            recent: RecentEventIds::new(recent_capacity),
            last_event: None,
        }
    }

    /// Applies one event.
    pub fn apply(&mut self, event: RealtimeEvent) -> ProjectionOutcome {
        if event.event_id().is_some_and(|id| self.recent.contains(id)) {
            return ProjectionOutcome::Duplicate;
        }
        if matches!(event, RealtimeEvent::Unrecognized { .. }) {
            return ProjectionOutcome::Ignored;
        }
        if let Some(id) = event.event_id() {
            self.recent.insert(id);
        }

        let next = project(&self.previews, &event, self.limit);
        let outcome = if next == self.previews {
            ProjectionOutcome::Unchanged
        } else {
            self.previews = next;
            ProjectionOutcome::Changed
        };

        self.last_event = Some(LastEvent {
            event,
            received_at: Utc::now(),
        });
        outcome
    }

    /// Installs a freshly fetched list.
    pub fn replace(&mut self, mut previews: Vec<ConversationSummary>) {
        previews.truncate(self.limit);
        self.previews = previews;
    }

    pub fn previews(&self) -> &[ConversationSummary] {
        &self.previews
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Sum of unread counters over the list.
    pub fn total_unread(&self) -> u64 {
        self.previews.iter().map(|p| u64::from(p.unread_count)).sum()
    }

    pub fn last_event(&self) -> Option<&LastEvent> {
        self.last_event.as_ref()
    }

    pub fn recent_ids(&self) -> &RecentEventIds {
        &self.recent
    }

    /// Drops previews, history and remembered ids.
    pub fn clear(&mut self) {
        self.previews.clear();
        self.recent.clear();
        self.last_event = None;
    }
}

impl Default for EventProjector {
    fn default() -> Self {
        Self::new(DEFAULT_PREVIEW_LIMIT)
    }
}
