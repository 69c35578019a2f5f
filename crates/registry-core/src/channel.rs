//! Server-side interest channel with no transport underneath.
//!
//! Opening a channel subscribes it to the registry change stream. A background
//! task drains the stream and counts the notifications that match the
//! channel's interest, standing in for the writes a real channel would push
//! to its client.

use crate::interest::Interest;
use crate::registry::Registry;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

static NEXT_CHANNEL_ID: AtomicU64 = AtomicU64::new(0);

pub struct InterestChannel {
    id: u64,
    interest: Interest,
    delivered: Arc<AtomicU64>,
    cancel: CancellationToken,
    closed: AtomicBool,
}

impl InterestChannel {
    /// Open a channel on `registry` subscribed to `interest`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open(registry: &dyn Registry, interest: Interest) -> Self {
        let id = NEXT_CHANNEL_ID.fetch_add(1, Ordering::Relaxed);
        let delivered = Arc::new(AtomicU64::new(0));
        let cancel = CancellationToken::new();

        let mut changes = registry.changes();
        let task_interest = interest.clone();
        let task_delivered = Arc::clone(&delivered);
        let task_cancel = cancel.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = task_cancel.cancelled() => break,
                    change = changes.recv() => match change {
                        Ok(notification) => {
                            if task_interest.matches(&notification.instance) {
                                task_delivered.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            debug!("Interest channel {id} lagged, {skipped} notifications dropped");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
            trace!("Interest channel {id} drain task finished");
        });

        Self {
            id,
            interest,
            delivered,
            cancel,
            closed: AtomicBool::new(false),
        }
    }

    /// Close the channel.
    ///
    /// Returns `true` only for the call that actually closed it.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.cancel.cancel();
        true
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn interest(&self) -> &Interest {
        &self.interest
    }

    /// Notifications matched so far.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }
}

impl Drop for InterestChannel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for InterestChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterestChannel")
            .field("id", &self.id)
            .field("interest", &self.interest)
            .field("closed", &self.is_closed())
            .finish()
    }
}
