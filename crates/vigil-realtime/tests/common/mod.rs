#![allow(dead_code)]
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::channel::mpsc::{UnboundedSender, unbounded};
use parking_lot::Mutex;
use url::Url;
use vigil_core::VigilError;
use vigil_realtime::{EngineConfig, EventTransport, FrameStream, RealtimeEngine, Subscription, TransportFrame};

pub const HUB: &str = "https://hub.test/.well-known/events";

type FrameSender = UnboundedSender<Result<TransportFrame, VigilError>>;

/// In-memory transport driven by the test.
///
/// Every `open` is recorded. Frames are pushed into the most recent connection.
#[derive(Default)]
pub struct ScriptedTransport {
    opens: Mutex<Vec<Url>>,
    senders: Mutex<Vec<FrameSender>>,
    refuse: AtomicU32,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn open_count(&self) -> usize {
        self.opens.lock().len()
    }

    /// Topics requested by the n-th open.
    pub fn topics_of(&self, n: usize) -> Vec<String> {
        self.opens.lock()[n]
            .query_pairs()
            .filter(|(k, _)| k == "topic")
            .map(|(_, v)| v.into_owned())
            .collect()
    }

    /// Refuses the next `n` opens.
    pub fn refuse_next(&self, n: u32) {
        self.refuse.store(n, Ordering::SeqCst);
    }

    pub fn send(&self, data: &str) {
        self.push(Ok(TransportFrame::message(data)));
    }

    pub fn send_with_id(&self, id: &str, data: &str) {
        self.push(Ok(TransportFrame::Message {
            id: Some(id.to_string()),
            data: data.to_string(),
        }));
    }

    pub fn advise_retry(&self, delay: Duration) {
        self.push(Ok(TransportFrame::Retry(delay)));
    }

    pub fn fail(&self, reason: &str) {
        self.push(Err(VigilError::transport(reason)));
    }

    fn push(&self, frame: Result<TransportFrame, VigilError>) {
        if let Some(sender) = self.senders.lock().last() {
            let _ = sender.unbounded_send(frame);
        }
    }
}

#[async_trait]
impl EventTransport for ScriptedTransport {
    async fn open(&self, url: &Url, _with_credentials: bool) -> Result<FrameStream, VigilError> {
        self.opens.lock().push(url.clone());

        let refused = self
            .refuse
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(VigilError::transport("connection refused"));
        }

        let (tx, rx) = unbounded();
        self.senders.lock().push(tx);
        Ok(rx.boxed())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub fn engine(transport: &Arc<ScriptedTransport>) -> RealtimeEngine {
    RealtimeEngine::new(transport.clone(), EngineConfig::default())
}

pub fn template() -> Subscription {
    Subscription::new(HUB, ["user/{userId}", "conv/{conversationId}"])
}

/// Lets spawned tasks run without moving the paused clock.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

pub fn upsert(event_id: &str, conversation_id: &str, unread: u32) -> String {
    format!(
        r#"{{"type":"conversation.updated","eventId":"{event_id}","conversation":{{"id":"{conversation_id}","unreadCount":{unread}}}}}"#
    )
}

pub fn unread(conversation_id: &str, unread: u32) -> String {
    format!(
        r#"{{"type":"conversation.unread","conversationId":"{conversation_id}","unreadCount":{unread}}}"#
    )
}
