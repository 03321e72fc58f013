//! Server-sent events over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use bytes::{Buf, BytesMut};
use futures::{StreamExt, future, stream};
use reqwest::header::{ACCEPT, CACHE_CONTROL, COOKIE};
use tracing::debug;
use url::Url;
use vigil_core::VigilError;

use crate::transport::{EventTransport, FrameStream, TransportFrame};

/// Longest line the decoder holds while waiting for its terminator.
pub const MAX_PENDING_LINE: usize = 64 * 1024;

/// Incremental `text/event-stream` decoder.
///
/// Bytes may arrive split at any position. `data:` lines are joined with a
/// newline and dispatched on a blank line. `retry:` is surfaced immediately,
/// while comments and `event:` names are ignored.
#[derive(Debug)]
pub struct SseDecoder {
    buffer: BytesMut,
    data: Vec<String>,
    id: Option<String>,
    max_line: usize,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::with_max_line(MAX_PENDING_LINE)
    }
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            data: Vec::new(),
            id: None,
            max_line,
        }
    }

    /// Feeds a chunk and returns every frame it completes.
    ///
    /// Fails once an unterminated line grows past the configured maximum;
    /// the decoder should not be fed again after that.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<TransportFrame>, VigilError> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line = self.buffer.split_to(pos + 1);
            let mut line = String::from_utf8_lossy(&line[..pos]).into_owned();
            if line.ends_with('\r') {
                line.pop();
            }
            if let Some(frame) = self.line(&line) {
                frames.push(frame);
            }
        }

        if self.buffer.len() > self.max_line {
            let held = self.buffer.len();
            self.buffer.clear();
            return Err(VigilError::transport(format!(
                "event stream line exceeds {} bytes ({held} pending)",
                self.max_line
            )));
        }

        Ok(frames)
    }

    /// Bytes held back waiting for a line terminator.
    pub fn pending(&self) -> usize {
        self.buffer.remaining()
    }

    fn line(&mut self, line: &str) -> Option<TransportFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => self.data.push(value.to_string()),
            "id" => self.id = Some(value.to_string()).filter(|id| !id.is_empty()),
            "retry" => {
                if let Ok(ms) = value.trim().parse::<u64>() {
                    return Some(TransportFrame::Retry(Duration::from_millis(ms)));
                }
            },
            _ => {},
        }
        None
    }

    fn dispatch(&mut self) -> Option<TransportFrame> {
        let id = self.id.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(TransportFrame::Message { id, data })
    }
}

/// [`EventTransport`] reading server-sent events with reqwest.
#[derive(Debug, Clone)]
pub struct SseTransport {
    client: reqwest::Client,
    cookie: Option<String>,
}

impl SseTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            cookie: None,
        }
    }

    /// Cookie header sent when a subscription asks for credentials.
    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }
}

impl Default for SseTransport {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

#[async_trait]
impl EventTransport for SseTransport {
    async fn open(&self, url: &Url, with_credentials: bool) -> Result<FrameStream, VigilError> {
        let mut request = self
            .client
            .get(url.clone())
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache");

        if with_credentials {
            if let Some(cookie) = &self.cookie {
                request = request.header(COOKIE, cookie);
            }
        }

        let response = request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| VigilError::transport(e.to_string()))?;

        debug!(status = %response.status(), "Event stream opened");

        let mut decoder = SseDecoder::new();
        let frames = response
            .bytes_stream()
            .map(move |chunk| match chunk {
                Ok(bytes) => match decoder.push(&bytes) {
                    Ok(frames) => frames.into_iter().map(Ok).collect::<Vec<_>>(),
                    Err(e) => vec![Err(e)],
                },
                Err(e) => vec![Err(VigilError::transport(e.to_string()))],
            })
            .flat_map(stream::iter)
            // el primer error cierra el stream
            .scan(false, |failed, frame| {
                if *failed {
                    return future::ready(None);
                }
                *failed = frame.is_err();
                future::ready(Some(frame))
            });

        Ok(frames.boxed())
    }

    fn name(&self) -> &str {
        "sse"
    }
}
