use serde::Serialize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

use nmea0183::FramerStats;

use crate::ble_notifier::NotifierStats;
use crate::command_intake::CommandMailbox;
use crate::sentence_decoder::DecoderStats;
use crate::serial_transport::ReaderStats;
use crate::stream_hub::StreamHub;
use crate::tcp_broadcaster::TcpBroadcaster;
use crate::vessel_state_handler::HandlerStats;
use crate::work_queue::{PressureLevel, QueueStats};

/// Pipeline counters gathered from every component
/// (not to be confused with vessel data like wind or depth).
///
/// Counters only grow; `backpressure_level`, `tcp_clients` and
/// `stream_subscribers` are gauges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AppMetrics {
    pub bytes_read: u64,
    pub transport_overruns: u64,
    pub transport_errors: u64,
    pub lines_framed: u64,
    pub framing_errors: u64,
    pub sentences_valid: u64,
    pub sentences_invalid: u64,
    pub sentences_unsupported: u64,
    pub queue_enqueued: u64,
    pub queue_dropped: u64,
    pub pressure_escalations: u64,
    /// 0 normal, 1 elevated, 2 severe
    pub backpressure_level: u64,
    pub sentences_applied: u64,
    pub ais_targets_updated: u64,
    pub ais_dropped: u64,
    pub tcp_clients: u64,
    pub tcp_lines: u64,
    pub tcp_evicted: u64,
    /// Lines withheld from TCP clients while under backpressure
    pub tcp_lines_shed: u64,
    pub stream_published: u64,
    /// Lines published while no stream client was listening
    pub stream_unheard: u64,
    pub stream_subscribers: u64,
    pub ble_notifications: u64,
    pub commands_received: u64,
}

impl AppMetrics {
    /// Counter increments since `earlier`; gauges keep their current value.
    pub fn since(&self, earlier: &AppMetrics) -> AppMetrics {
        let d = |now: u64, then: u64| now.saturating_sub(then);
        AppMetrics {
            bytes_read: d(self.bytes_read, earlier.bytes_read),
            transport_overruns: d(self.transport_overruns, earlier.transport_overruns),
            transport_errors: d(self.transport_errors, earlier.transport_errors),
            lines_framed: d(self.lines_framed, earlier.lines_framed),
            framing_errors: d(self.framing_errors, earlier.framing_errors),
            sentences_valid: d(self.sentences_valid, earlier.sentences_valid),
            sentences_invalid: d(self.sentences_invalid, earlier.sentences_invalid),
            sentences_unsupported: d(self.sentences_unsupported, earlier.sentences_unsupported),
            queue_enqueued: d(self.queue_enqueued, earlier.queue_enqueued),
            queue_dropped: d(self.queue_dropped, earlier.queue_dropped),
            pressure_escalations: d(self.pressure_escalations, earlier.pressure_escalations),
            backpressure_level: self.backpressure_level,
            sentences_applied: d(self.sentences_applied, earlier.sentences_applied),
            ais_targets_updated: d(self.ais_targets_updated, earlier.ais_targets_updated),
            ais_dropped: d(self.ais_dropped, earlier.ais_dropped),
            tcp_clients: self.tcp_clients,
            tcp_lines: d(self.tcp_lines, earlier.tcp_lines),
            tcp_evicted: d(self.tcp_evicted, earlier.tcp_evicted),
            tcp_lines_shed: d(self.tcp_lines_shed, earlier.tcp_lines_shed),
            stream_published: d(self.stream_published, earlier.stream_published),
            stream_unheard: d(self.stream_unheard, earlier.stream_unheard),
            stream_subscribers: self.stream_subscribers,
            ble_notifications: d(self.ble_notifications, earlier.ble_notifications),
            commands_received: d(self.commands_received, earlier.commands_received),
        }
    }

    pub fn log(&self) {
        info!(
            "[Metrics] Bytes: {}, Lines: {} ({} framing errors), Sentences: {} valid / {} invalid / {} unsupported, Queue: {} in / {} dropped, Applied: {}, AIS: {} updated / {} dropped",
            self.bytes_read,
            self.lines_framed,
            self.framing_errors,
            self.sentences_valid,
            self.sentences_invalid,
            self.sentences_unsupported,
            self.queue_enqueued,
            self.queue_dropped,
            self.sentences_applied,
            self.ais_targets_updated,
            self.ais_dropped
        );
        info!(
            "[Metrics] TCP: {} clients, {} lines, {} shed, {} evicted, Stream: {} published / {} unheard / {} subscribers, BLE: {} notifications, Commands: {}, Overruns: {}, Transport errors: {}",
            self.tcp_clients,
            self.tcp_lines,
            self.tcp_lines_shed,
            self.tcp_evicted,
            self.stream_published,
            self.stream_unheard,
            self.stream_subscribers,
            self.ble_notifications,
            self.commands_received,
            self.transport_overruns,
            self.transport_errors
        );
        info!(
            "[Metrics] Backpressure: level {}, {} escalations",
            self.backpressure_level, self.pressure_escalations
        );
    }
}

/// Counters owned by the ingestion stage itself.
#[derive(Debug, Clone, Copy)]
pub struct StageCounters {
    pub framer: FramerStats,
    pub decoder: DecoderStats,
    pub escalations: u64,
    pub level: PressureLevel,
    pub shed_broadcasts: u64,
}

/// Shared counters of the components that outlive a single stage.
#[derive(Clone)]
pub struct MetricsSources {
    pub reader: Option<Arc<ReaderStats>>,
    pub queue: Arc<QueueStats>,
    pub handler: Arc<HandlerStats>,
    pub broadcaster: Arc<TcpBroadcaster>,
    pub hub: Arc<StreamHub>,
    pub notifier: Option<Arc<NotifierStats>>,
    pub mailbox: Arc<CommandMailbox>,
}

impl MetricsSources {
    /// Combine the shared counters with the ones owned by the ingestion stage.
    pub fn collect(&self, stage: StageCounters) -> AppMetrics {
        let mut m = AppMetrics {
            lines_framed: stage.framer.lines_received,
            framing_errors: stage.framer.errors,
            sentences_valid: stage.decoder.valid,
            sentences_invalid: stage.decoder.invalid,
            sentences_unsupported: stage.decoder.unsupported,
            pressure_escalations: stage.escalations,
            backpressure_level: stage.level as u64,
            tcp_lines_shed: stage.shed_broadcasts,
            ..AppMetrics::default()
        };

        if let Some(reader) = &self.reader {
            m.bytes_read = reader.bytes_read.load(Ordering::Relaxed);
            m.transport_overruns = reader.overruns.load(Ordering::Relaxed);
            m.transport_errors = reader.read_errors.load(Ordering::Relaxed);
        }

        m.queue_enqueued = self.queue.enqueued.load(Ordering::Relaxed);
        m.queue_dropped = self.queue.dropped.load(Ordering::Relaxed);

        let handler = self.handler.counts();
        m.sentences_applied = handler.applied;
        m.ais_targets_updated = handler.ais_position_reports;
        m.ais_dropped = handler.ais_fragments_dropped + handler.ais_decode_errors + handler.ais_table_full;

        let tcp = self.broadcaster.stats();
        m.tcp_clients = self.broadcaster.client_count() as u64;
        m.tcp_lines = tcp.lines.load(Ordering::Relaxed);
        m.tcp_evicted = tcp.evicted.load(Ordering::Relaxed);

        m.stream_published = self.hub.published();
        m.stream_unheard = self.hub.unheard();
        m.stream_subscribers = self.hub.subscriber_count() as u64;

        if let Some(notifier) = &self.notifier {
            m.ble_notifications = notifier.notifications.load(Ordering::Relaxed);
        }
        m.commands_received = self.mailbox.counts().submitted;
        m
    }
}

/// Logs the counter increments of each interval.
pub struct MetricsLogger {
    last_log: Instant,
    log_interval: Duration,
    baseline: AppMetrics,
}

impl MetricsLogger {
    pub fn new(log_interval: Duration) -> Self {
        Self::starting_at(log_interval, Instant::now())
    }

    pub fn starting_at(log_interval: Duration, now: Instant) -> Self {
        Self {
            last_log: now,
            log_interval,
            baseline: AppMetrics::default(),
        }
    }

    /// Returns the logged increments when the interval has elapsed.
    pub fn check_and_log_at(&mut self, current: &AppMetrics, now: Instant) -> Option<AppMetrics> {
        if now.saturating_duration_since(self.last_log) < self.log_interval {
            return None;
        }
        let delta = current.since(&self.baseline);
        delta.log();
        self.baseline = *current;
        self.last_log = now;
        Some(delta)
    }
}
