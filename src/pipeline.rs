//! The two stages between the byte channel and the state store.
//!
//! Ingestion frames and validates lines, then fans each valid sentence out
//! in arrival order: work queue, stream hub, TCP clients. Processing drains
//! the work queue into the state store at its own pace.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use nmea0183::{MessageHandler, NmeaMessage, Sentence};

use crate::app_metrics::{AppMetrics, MetricsLogger, MetricsSources, StageCounters};
use crate::config::PipelineConfig;
use crate::line_reader::LineReader;
use crate::sentence_decoder::SentenceDecoder;
use crate::stream_hub::StreamHub;
use crate::tcp_broadcaster::TcpBroadcaster;
use crate::vessel_state_handler::VesselStateHandler;
use crate::work_queue::{BackpressureMonitor, PressureLevel, RecvTimeoutError, WorkReceiver, WorkSender};

const METRICS_LOG_INTERVAL: Duration = Duration::from_secs(60);
const SNAPSHOT_INTERVAL: Duration = Duration::from_secs(1);
const ELEVATED_TIMEOUT_FACTOR: u32 = 2;
const DEQUEUE_TIMEOUT: Duration = Duration::from_millis(200);

/// Latest metrics snapshot, refreshed by the ingestion stage.
pub type SharedMetrics = Arc<Mutex<AppMetrics>>;

/// What one ingestion step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// No complete line within the timeout
    Idle,
    /// Line failed validation; nothing forwarded
    Rejected,
    Forwarded {
        queued: bool,
        subscribers: usize,
        /// `None` when the TCP path was shed under backpressure
        clients: Option<usize>,
    },
    /// The byte channel hung up
    Closed,
}

pub struct IngestionStage {
    reader: LineReader,
    decoder: SentenceDecoder,
    queue: WorkSender<Sentence>,
    monitor: BackpressureMonitor,
    broadcaster: Arc<TcpBroadcaster>,
    hub: Arc<StreamHub>,
    line_timeout: Duration,
    enqueue_timeout: Duration,
    severe_pause: Duration,
    sources: MetricsSources,
    metrics_logger: MetricsLogger,
    shared: SharedMetrics,
    last_snapshot: Instant,
    shed_broadcasts: u64,
}

impl IngestionStage {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        reader: LineReader,
        queue: WorkSender<Sentence>,
        broadcaster: Arc<TcpBroadcaster>,
        hub: Arc<StreamHub>,
        config: &PipelineConfig,
        sources: MetricsSources,
        shared: SharedMetrics,
    ) -> Self {
        Self {
            reader,
            decoder: SentenceDecoder::new(),
            queue,
            monitor: BackpressureMonitor::new(
                config.adaptive_backpressure,
                config.elevated_threshold,
                config.severe_threshold,
            ),
            broadcaster,
            hub,
            line_timeout: config.line_timeout(),
            enqueue_timeout: config.enqueue_timeout(),
            severe_pause: config.severe_pause(),
            sources,
            metrics_logger: MetricsLogger::new(METRICS_LOG_INTERVAL),
            shared,
            last_snapshot: Instant::now(),
            shed_broadcasts: 0,
        }
    }

    /// Handle at most one line.
    pub fn step(&mut self) -> Step {
        let timeout = match self.monitor.level() {
            PressureLevel::Normal => self.line_timeout,
            _ => self.line_timeout * ELEVATED_TIMEOUT_FACTOR,
        };

        let Some(line) = self.reader.read_line(timeout) else {
            return if self.reader.is_closed() { Step::Closed } else { Step::Idle };
        };

        let (sentence, accepted) = self.decoder.decode(&line);
        if !accepted {
            return Step::Rejected;
        }

        let raw = sentence.raw.clone();
        let queued = self.queue.enqueue(sentence, self.enqueue_timeout);
        let level = self.monitor.record(queued);
        if !queued {
            debug!("Work queue full, dropped {}", raw);
        }

        let subscribers = self.hub.publish(&raw);
        let clients = match level {
            PressureLevel::Normal => Some(self.broadcaster.broadcast(&raw)),
            _ => {
                self.shed_broadcasts += 1;
                None
            }
        };

        if level == PressureLevel::Severe {
            thread::sleep(self.severe_pause);
        }

        Step::Forwarded { queued, subscribers, clients }
    }

    pub fn metrics(&self) -> AppMetrics {
        self.sources.collect(StageCounters {
            framer: self.reader.stats(),
            decoder: self.decoder.stats(),
            escalations: self.monitor.escalations(),
            level: self.monitor.level(),
            shed_broadcasts: self.shed_broadcasts,
        })
    }

    fn report(&mut self, now: Instant) {
        if now.saturating_duration_since(self.last_snapshot) < SNAPSHOT_INTERVAL {
            return;
        }
        self.last_snapshot = now;
        let current = self.metrics();
        *self.shared.lock().unwrap_or_else(|p| p.into_inner()) = current;
        self.metrics_logger.check_and_log_at(&current, now);
    }

    pub fn run(mut self, shutdown: Arc<AtomicBool>) {
        info!("Ingestion stage running");
        while !shutdown.load(Ordering::Relaxed) {
            if self.step() == Step::Closed {
                info!("Byte channel closed, ingestion stage exiting");
                break;
            }
            self.report(Instant::now());
        }
        info!("Ingestion stage stopped");
    }

    pub fn spawn(self, shutdown: Arc<AtomicBool>) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new().name("ingestion".to_string()).spawn(move || self.run(shutdown))
    }
}

/// Applies queued sentences to the state store.
pub struct ProcessingStage {
    queue: WorkReceiver<Sentence>,
    handler: VesselStateHandler,
}

impl ProcessingStage {
    pub fn new(queue: WorkReceiver<Sentence>, handler: VesselStateHandler) -> Self {
        Self { queue, handler }
    }

    pub fn process_next(&mut self, timeout: Duration) -> Result<(), RecvTimeoutError> {
        let sentence = self.queue.dequeue(timeout)?;
        let message = NmeaMessage::from_sentence(&sentence);
        self.handler.handle_message(&message, Instant::now());
        Ok(())
    }

    pub fn run(mut self, shutdown: Arc<AtomicBool>) {
        info!("Processing stage running");
        while !shutdown.load(Ordering::Relaxed) {
            match self.process_next(DEQUEUE_TIMEOUT) {
                Ok(()) | Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        info!("Processing stage stopped");
    }

    pub fn spawn(self, shutdown: Arc<AtomicBool>) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new().name("processing".to_string()).spawn(move || self.run(shutdown))
    }
}

pub fn join_stage(handle: JoinHandle<()>) {
    let name = handle.thread().name().unwrap_or("stage").to_string();
    if handle.join().is_err() {
        error!("{} thread panicked", name);
    }
}
