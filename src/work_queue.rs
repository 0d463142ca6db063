use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub use crossbeam_channel::RecvTimeoutError;

#[derive(Debug, Default)]
pub struct QueueStats {
    pub enqueued: AtomicU64,
    /// Items abandoned after the enqueue timeout
    pub dropped: AtomicU64,
}

/// Producer half of the bounded queue between ingestion and processing.
pub struct WorkSender<T> {
    tx: Sender<T>,
    stats: Arc<QueueStats>,
}

pub struct WorkReceiver<T> {
    rx: Receiver<T>,
}

pub fn work_queue<T>(capacity: usize) -> (WorkSender<T>, WorkReceiver<T>) {
    let (tx, rx) = bounded(capacity);
    let sender = WorkSender {
        tx,
        stats: Arc::new(QueueStats::default()),
    };
    (sender, WorkReceiver { rx })
}

impl<T> WorkSender<T> {
    /// Block for at most `timeout` waiting for a free slot; on failure the
    /// item is dropped and counted.
    pub fn enqueue(&self, item: T, timeout: Duration) -> bool {
        match self.tx.send_timeout(item, timeout) {
            Ok(()) => {
                self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
                true
            }
            // Timed out, or the processing side is gone
            Err(_) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    pub fn stats(&self) -> Arc<QueueStats> {
        Arc::clone(&self.stats)
    }
}

impl<T> WorkReceiver<T> {
    pub fn dequeue(&self, timeout: Duration) -> Result<T, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PressureLevel {
    Normal,
    /// Shed optional work and poll less often
    Elevated,
    /// Pause the producer briefly
    Severe,
}

/// Tracks consecutive enqueue failures and maps them to a pressure level.
pub struct BackpressureMonitor {
    enabled: bool,
    elevated_threshold: u32,
    severe_threshold: u32,
    consecutive_failures: u32,
    level: PressureLevel,
    escalations: u64,
}

impl BackpressureMonitor {
    pub fn new(enabled: bool, elevated_threshold: u32, severe_threshold: u32) -> Self {
        Self {
            enabled,
            elevated_threshold,
            severe_threshold,
            consecutive_failures: 0,
            level: PressureLevel::Normal,
            escalations: 0,
        }
    }

    /// Record one enqueue outcome and return the resulting level.
    pub fn record(&mut self, enqueued: bool) -> PressureLevel {
        if enqueued {
            self.consecutive_failures = 0;
        } else {
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        }

        let level = if !self.enabled {
            PressureLevel::Normal
        } else if self.consecutive_failures >= self.severe_threshold {
            PressureLevel::Severe
        } else if self.consecutive_failures >= self.elevated_threshold {
            PressureLevel::Elevated
        } else {
            PressureLevel::Normal
        };

        if level > self.level {
            self.escalations += 1;
            warn!(
                "Backpressure {:?}: {} consecutive enqueue failures",
                level, self.consecutive_failures
            );
        } else if level == PressureLevel::Normal && self.level != PressureLevel::Normal {
            info!("Backpressure cleared");
        }
        self.level = level;
        level
    }

    pub fn level(&self) -> PressureLevel {
        self.level
    }

    pub fn escalations(&self) -> u64 {
        self.escalations
    }
}
