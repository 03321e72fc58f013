//! Single-slot reconnect timer.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

/// Holds at most one pending reconnect.
///
/// Scheduling aborts whatever was pending before, so there is never more than
/// one timer per session.
#[derive(Debug, Default)]
pub struct ReconnectTimer {
    handle: Option<JoinHandle<()>>,
    scheduled: u64,
}

impl ReconnectTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `on_elapsed` after `delay`, replacing any pending timer.
    pub fn schedule<F>(&mut self, delay: Duration, on_elapsed: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        self.scheduled += 1;
        debug!(delay_ms = delay.as_millis() as u64, "Reconnect scheduled");

        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            on_elapsed.await;
        }));
    }

    /// Aborts the pending timer, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Forgets the handle without aborting. Used by the timer's own task.
    pub fn disarm(&mut self) {
        self.handle = None;
    }

    pub fn is_pending(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// How many timers were ever scheduled.
    pub fn scheduled(&self) -> u64 {
        self.scheduled
    }
}

impl Drop for ReconnectTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
