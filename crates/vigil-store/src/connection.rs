//! Lazily established, memoized connection handle.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::StoreError;

type ConnectFuture<C> = Shared<BoxFuture<'static, Result<C, StoreError>>>;

enum Slot<C> {
    Empty,
    Connecting { attempt: u64, future: ConnectFuture<C> },
    Ready { attempt: u64, connection: C },
}

/// Holds at most one live connection and at most one connection attempt.
///
/// Concurrent first callers all await the same attempt. A failed attempt, or a
/// call to [`invalidate`](Self::invalidate), empties the slot so the next
/// caller starts a fresh one.
pub(crate) struct LazyConnection<C> {
    slot: Mutex<Slot<C>>,
    attempts: AtomicU64,
}

impl<C> LazyConnection<C>
where
    C: Clone + Send + Sync + 'static,
{
    pub(crate) fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Empty),
            attempts: AtomicU64::new(0),
        }
    }

    /// Returns the live connection, connecting with `connect` if needed.
    ///
    /// The returned attempt number identifies the handle for `invalidate`.
    pub(crate) async fn get_or_connect<F, Fut>(&self, connect: F) -> Result<(u64, C), StoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<C, StoreError>> + Send + 'static,
    {
        let (attempt, future) = {
            let mut slot = self.slot.lock();
            match &*slot {
                Slot::Ready {
                    attempt,
                    connection,
                } => return Ok((*attempt, connection.clone())),
                Slot::Connecting { attempt, future } => (*attempt, future.clone()),
                Slot::Empty => {
                    let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
                    let future = connect().boxed().shared();
                    debug!(attempt, "Opening key-value store connection");
                    *slot = Slot::Connecting {
                        attempt,
                        future: future.clone(),
                    };
                    (attempt, future)
                },
            }
        };

        let result = future.await;

        let mut slot = self.slot.lock();
        let still_current =
            matches!(&*slot, Slot::Connecting { attempt: a, .. } if *a == attempt);

        match result {
            Ok(connection) => {
                if still_current {
                    info!(attempt, "Key-value store connection established");
                    *slot = Slot::Ready {
                        attempt,
                        connection: connection.clone(),
                    };
                }
                Ok((attempt, connection))
            },
            Err(err) => {
                if still_current {
                    *slot = Slot::Empty;
                }
                Err(err)
            },
        }
    }

    /// Drops the memoized handle if it is still the one from `attempt`.
    pub(crate) fn invalidate(&self, attempt: u64) {
        let mut slot = self.slot.lock();
        if matches!(&*slot, Slot::Ready { attempt: a, .. } if *a == attempt) {
            *slot = Slot::Empty;
        }
    }

    /// Number of connection attempts started so far.
    pub(crate) fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }
}
