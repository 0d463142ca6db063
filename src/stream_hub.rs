use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Publish/subscribe endpoint for the raw sentence stream.
///
/// Subscribers only see lines published after they subscribed. A subscriber
/// that falls more than `capacity` lines behind loses the oldest ones; the
/// publisher is never slowed down.
pub struct StreamHub {
    tx: broadcast::Sender<Arc<str>>,
    published: AtomicU64,
    unheard: AtomicU64,
}

impl StreamHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            published: AtomicU64::new(0),
            unheard: AtomicU64::new(0),
        }
    }

    /// Returns the number of subscribers the line was queued for.
    pub fn publish(&self, line: &str) -> usize {
        self.published.fetch_add(1, Ordering::Relaxed);
        match self.tx.send(Arc::from(line)) {
            Ok(receivers) => receivers,
            Err(_) => {
                self.unheard.fetch_add(1, Ordering::Relaxed);
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<str>> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Lines published while nobody was subscribed.
    pub fn unheard(&self) -> u64 {
        self.unheard.load(Ordering::Relaxed)
    }
}
