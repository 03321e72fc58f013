//! Realtime subscription engine.
//!
//! One engine per client session. It owns the transport connection, the
//! reconnect timer and the preview list fed by incoming events. Background
//! tasks hold only a weak reference to the engine and carry the generation
//! they were started for, so anything they report after a teardown or a
//! forced reconnect is discarded.

use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;
use vigil_core::{ConversationSummary, RealtimeEvent, Result};

use crate::projector::{DEFAULT_PREVIEW_LIMIT, EventProjector, LastEvent, ProjectionOutcome};
use crate::state::{ConnectionState, Signal};
use crate::subscription::{DEFAULT_RETRY, Subscription};
use crate::timer::ReconnectTimer;
use crate::topics::{TopicContext, expand_topics};
use crate::transport::{EventTransport, TransportFrame};

/// Engine tuning.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum previews kept.
    pub preview_limit: usize,
    /// Reconnect delay when neither subscription nor hub sets one.
    pub default_retry: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            preview_limit: DEFAULT_PREVIEW_LIMIT,
            default_retry: DEFAULT_RETRY,
        }
    }
}

/// Point-in-time view of the engine.
#[derive(Debug, Clone)]
pub struct EngineSnapshot {
    pub state: ConnectionState,
    pub topics: Vec<String>,
    pub previews: Vec<ConversationSummary>,
    pub total_unread: u64,
    pub last_event: Option<LastEvent>,
    pub reconnect_pending: bool,
    pub reconnects_scheduled: u64,
}

struct Session {
    state: ConnectionState,
    generation: u64,
    template: Option<Subscription>,
    context: TopicContext,
    active: Option<Subscription>,
    projector: EventProjector,
    connection: Option<JoinHandle<()>>,
    timer: ReconnectTimer,
    server_retry: Option<Duration>,
}

impl Session {
    fn close_connection(&mut self) {
        if let Some(handle) = self.connection.take() {
            handle.abort();
        }
    }
}

struct Inner {
    transport: Arc<dyn EventTransport>,
    config: EngineConfig,
    session: Mutex<Session>,
    state_tx: watch::Sender<ConnectionState>,
}

/// Keeps a preview list in sync with a push-event hub.
///
/// ```ignore
/// let engine = RealtimeEngine::new(Arc::new(SseTransport::default()), EngineConfig::default());
/// engine.subscribe(template, None);
/// engine.update_context(Some("u1"), ["c1", "c2"]);
/// engine.connect()?;
/// ```
pub struct RealtimeEngine {
    inner: Arc<Inner>,
}

impl RealtimeEngine {
    pub fn new(transport: Arc<dyn EventTransport>, config: EngineConfig) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Idle);
        let session = Session {
            state: ConnectionState::Idle,
            generation: 0,
            template: None,
            context: TopicContext::default(),
            active: None,
            projector: EventProjector::new(config.preview_limit),
            connection: None,
            timer: ReconnectTimer::new(),
            server_retry: None,
        };

        Self {
            inner: Arc::new(Inner {
                transport,
                config,
                session: Mutex::new(session),
                state_tx,
            }),
        }
    }

    /// Installs the subscription template, merged with runtime values.
    ///
    /// Topics are expanded against the current context right away. Returns
    /// true when the expanded topic set changed.
    pub fn subscribe(&self, template: Subscription, fallback: Option<Subscription>) -> bool {
        let merged = Subscription::merge(&template, fallback.as_ref());
        let mut session = self.inner.session.lock();
        session.template = Some(merged);
        self.inner.refresh_topics(&mut session)
    }

    /// Opens the connection.
    ///
    /// Does nothing and returns `Ok(false)` unless the engine is idle and the
    /// expanded subscription is connectable.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` when the hub URL does not parse.
    pub fn connect(&self) -> Result<bool> {
        let mut session = self.inner.session.lock();
        let Some(active) = session.active.as_ref().filter(|a| a.is_connectable()) else {
            debug!("Connect skipped: no connectable subscription");
            return Ok(false);
        };
        let url = active.connect_url()?;
        let with_credentials = active.sends_credentials();

        if !self.inner.transition(&mut session, Signal::Connect) {
            return Ok(false);
        }
        self.inner.start_connection(&mut session, url, with_credentials);
        Ok(true)
    }

    /// Updates the user and visible conversations the topics expand against.
    ///
    /// A changed topic set while connected closes the transport and reopens it
    /// with the full new set.
    pub fn update_context<I, S>(&self, user_id: Option<&str>, conversation_ids: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut session = self.inner.session.lock();
        session.context = TopicContext::new(user_id, conversation_ids);
        self.inner.refresh_topics(&mut session)
    }

    /// Closes everything and forgets the subscription and previews.
    pub fn teardown(&self) {
        let mut session = self.inner.session.lock();
        session.generation += 1;
        session.close_connection();
        session.timer.cancel();
        session.template = None;
        session.active = None;
        session.server_retry = None;
        session.projector.clear();
        self.inner.transition(&mut session, Signal::Teardown);
        info!("Realtime session torn down");
    }

    /// Installs a freshly fetched preview list.
    pub fn replace_previews(&self, previews: Vec<ConversationSummary>) {
        self.inner.session.lock().projector.replace(previews);
    }

    /// Applies an event as if it had arrived on the transport.
    pub fn apply_event(&self, event: RealtimeEvent) -> ProjectionOutcome {
        self.inner.session.lock().projector.apply(event)
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.session.lock().state
    }

    /// Subscribes to state changes.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        let session = self.inner.session.lock();
        EngineSnapshot {
            state: session.state,
            topics: session
                .active
                .as_ref()
                .map(|a| a.topics.clone())
                .unwrap_or_default(),
            previews: session.projector.previews().to_vec(),
            total_unread: session.projector.total_unread(),
            last_event: session.projector.last_event().cloned(),
            reconnect_pending: session.timer.is_pending(),
            reconnects_scheduled: session.timer.scheduled(),
        }
    }
}

impl Inner {
    fn transition(&self, session: &mut Session, signal: Signal) -> bool {
        match session.state.on(signal) {
            Some(next) => {
                if next != session.state {
                    debug!(from = %session.state, to = %next, ?signal, "Connection state changed");
                    session.state = next;
                    self.state_tx.send_replace(next);
                }
                true
            },
            None => false,
        }
    }

    fn start_connection(self: &Arc<Self>, session: &mut Session, url: Url, with_credentials: bool) {
        session.close_connection();
        session.generation += 1;
        let generation = session.generation;

        debug!(generation, transport = self.transport.name(), "Opening event stream");
        session.connection = Some(tokio::spawn(run_connection(
            Arc::downgrade(self),
            generation,
            url,
            with_credentials,
        )));
    }

    /// Re-expands topics and reconnects if the set changed.
    fn refresh_topics(self: &Arc<Self>, session: &mut Session) -> bool {
        let Some(template) = session.template.as_ref() else {
            return false;
        };
        let topics = expand_topics(&template.topics, &session.context);
        if session.active.as_ref().is_some_and(|a| a.topics == topics) {
            return false;
        }

        let active = Subscription {
            topics,
            ..template.clone()
        };
        info!(topics = ?active.topics, "Subscription topics changed");
        let connectable = active.is_connectable();
        let target = active.connect_url().ok().filter(|_| connectable);
        let with_credentials = active.sends_credentials();
        session.active = Some(active);

        match session.state {
            ConnectionState::Connecting | ConnectionState::Open => {
                session.close_connection();
                self.transition(session, Signal::TopicsChanged);
                match target {
                    Some(url) => {
                        self.transition(session, Signal::Retry);
                        self.start_connection(session, url, with_credentials);
                    },
                    None => self.close_idle(session),
                }
            },
            ConnectionState::Reconnecting if target.is_none() => self.close_idle(session),
            _ => {},
        }
        true
    }

    fn close_idle(&self, session: &mut Session) {
        session.generation += 1;
        session.close_connection();
        session.timer.cancel();
        self.transition(session, Signal::Closed);
    }

    fn on_opened(&self, generation: u64) -> bool {
        let mut session = self.session.lock();
        if session.generation != generation {
            return false;
        }
        session.timer.cancel();
        session.server_retry = None;
        self.transition(&mut session, Signal::Opened);
        info!("Event stream open");
        true
    }

    fn on_message(&self, generation: u64, id: Option<String>, data: &str) -> bool {
        let mut session = self.session.lock();
        if session.generation != generation {
            return false;
        }

        match RealtimeEvent::parse(data) {
            Ok(event) => {
                let event = event.with_fallback_id(id.as_deref());
                let kind = event.kind().to_string();
                let outcome = session.projector.apply(event);
                debug!(kind = %kind, ?outcome, "Event applied");
            },
            Err(e) => warn!(error = %e, "Dropping malformed event"),
        }
        true
    }

    fn on_retry_advice(&self, generation: u64, delay: Duration) {
        let mut session = self.session.lock();
        if session.generation == generation {
            session.server_retry = Some(delay);
        }
    }

    fn on_transport_error(self: &Arc<Self>, generation: u64, reason: &str) {
        let mut session = self.session.lock();
        if session.generation != generation {
            return;
        }
        // The reporting task is finishing on its own.
        session.connection = None;

        if !self.transition(&mut session, Signal::TransportError) {
            return;
        }

        let delay = session
            .server_retry
            .or_else(|| session.active.as_ref().and_then(|a| a.retry_delay()))
            .unwrap_or(self.config.default_retry);
        warn!(error = %reason, delay_ms = delay.as_millis() as u64, "Event stream lost, reconnecting");

        let weak = Arc::downgrade(self);
        session.timer.schedule(delay, async move {
            if let Some(inner) = weak.upgrade() {
                inner.on_retry_elapsed(generation);
            }
        });
    }

    fn on_retry_elapsed(self: &Arc<Self>, generation: u64) {
        let mut session = self.session.lock();
        if session.generation != generation {
            return;
        }
        session.timer.disarm();

        let Some(active) = session.active.as_ref() else {
            return;
        };
        let with_credentials = active.sends_credentials();
        match active.connect_url() {
            Ok(url) => {
                if self.transition(&mut session, Signal::Retry) {
                    self.start_connection(&mut session, url, with_credentials);
                }
            },
            Err(e) => {
                warn!(error = %e, "Cannot reconnect");
                self.close_idle(&mut session);
            },
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let session = self.session.get_mut();
        session.close_connection();
        session.timer.cancel();
    }
}

async fn run_connection(weak: Weak<Inner>, generation: u64, url: Url, with_credentials: bool) {
    let Some(transport) = weak.upgrade().map(|inner| Arc::clone(&inner.transport)) else {
        return;
    };

    let mut stream = match transport.open(&url, with_credentials).await {
        Ok(stream) => stream,
        Err(e) => {
            if let Some(inner) = weak.upgrade() {
                inner.on_transport_error(generation, e.message());
            }
            return;
        },
    };

    match weak.upgrade() {
        Some(inner) if inner.on_opened(generation) => {},
        _ => return,
    }

    while let Some(frame) = stream.next().await {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        match frame {
            Ok(TransportFrame::Message { id, data }) => {
                if !inner.on_message(generation, id, &data) {
                    return;
                }
            },
            Ok(TransportFrame::Retry(delay)) => inner.on_retry_advice(generation, delay),
            Err(e) => {
                inner.on_transport_error(generation, e.message());
                return;
            },
        }
    }

    if let Some(inner) = weak.upgrade() {
        inner.on_transport_error(generation, "event stream closed");
    }
}
