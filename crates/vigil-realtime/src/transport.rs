//! Push-event transport abstraction.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use url::Url;
use vigil_core::VigilError;

/// One unit delivered by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFrame {
    /// A message body, with the transport-level id when one was sent.
    Message { id: Option<String>, data: String },
    /// The hub advised a reconnect delay.
    Retry(Duration),
}

impl TransportFrame {
    /// Creates a message frame without an id.
    pub fn message(data: impl Into<String>) -> Self {
        Self::Message {
            id: None,
            data: data.into(),
        }
    }
}

/// Frames of one open connection. The stream ending means the connection closed.
pub type FrameStream = BoxStream<'static, Result<TransportFrame, VigilError>>;

/// Opens long-lived event streams.
///
/// # Implementors
///
/// - `SseTransport` - HTTP `text/event-stream` over reqwest
#[async_trait]
pub trait EventTransport: Send + Sync {
    /// Opens a connection. Returning `Ok` is the open signal.
    ///
    /// # Errors
    ///
    /// `Transport` when the connection cannot be established.
    async fn open(&self, url: &Url, with_credentials: bool) -> Result<FrameStream, VigilError>;

    /// Returns the name of this transport, for logs.
    fn name(&self) -> &str;
}
