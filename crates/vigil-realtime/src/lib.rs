//! # Vigil Realtime
//!
//! Push-event subscription engine for Vigil clients.
//!
//! This crate keeps a local conversation preview list consistent with a
//! push-event hub reached over server-sent events.
//!
//! ## Features
//!
//! - Subscription templates with `{userId}` / `{conversationId}` placeholders
//! - Explicit connection state machine with single-timer reconnect backoff
//! - Pure projection of events onto the preview list, with redelivery detection
//! - Pluggable transport; reqwest-based SSE transport included
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use vigil_realtime::{EngineConfig, RealtimeEngine, SseTransport, Subscription};
//!
//! let engine = RealtimeEngine::new(Arc::new(SseTransport::default()), EngineConfig::default());
//! engine.subscribe(
//!     Subscription::new("https://hub.example.com/events", ["conv/{conversationId}"]),
//!     None,
//! );
//! engine.update_context(Some("u1"), ["c1", "c2"]);
//! engine.connect()?;
//! ```

pub mod engine;
pub mod projector;
pub mod sse;
pub mod state;
pub mod subscription;
pub mod timer;
pub mod topics;
pub mod transport;

// Re-exports
pub use engine::{EngineConfig, EngineSnapshot, RealtimeEngine};
pub use projector::{EventProjector, LastEvent, ProjectionOutcome, RecentEventIds, project};
pub use sse::{MAX_PENDING_LINE, SseDecoder, SseTransport};
pub use state::{ConnectionState, Signal};
pub use subscription::{DEFAULT_RETRY, Subscription};
pub use timer::ReconnectTimer;
pub use topics::{TopicContext, expand_topics};
pub use transport::{EventTransport, FrameStream, TransportFrame};

// Re-export vigil_core for consumers
pub use vigil_core;
