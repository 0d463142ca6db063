//! Process wiring: builds every component, starts its thread and stops them
//! all again. Components receive their collaborators explicitly; nothing is
//! global.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::app_metrics::{AppMetrics, MetricsSources};
use crate::ble_notifier::{BleNotifier, CharacteristicTable, NotificationSink};
use crate::command_intake::{ActuationStub, CommandMailbox};
use crate::config::{Config, SettingsProvider};
use crate::error::Result;
use crate::line_reader::LineReader;
use crate::network_identity::HostIdentity;
use crate::pipeline::{join_stage, IngestionStage, ProcessingStage, SharedMetrics};
use crate::serial_transport::{sleep_unless, Chunk, SerialTransport, Transport, TransportReader};
use crate::state_store::VesselStateStore;
use crate::stream_hub::StreamHub;
use crate::tcp_broadcaster::{TcpBroadcaster, TcpServer, TransportEventSink};
use crate::vessel_state_handler::VesselStateHandler;
use crate::web::api::AppState;
use crate::web::server::{self, WebServer};
use crate::work_queue::work_queue;

const BYTE_CHANNEL_CAPACITY: usize = 32;
const STREAM_HUB_CAPACITY: usize = 64;
const REOPEN_DELAY: Duration = Duration::from_secs(2);
const HOUSEKEEPING_TICK: Duration = Duration::from_millis(250);
const AIS_PURGE_INTERVAL: Duration = Duration::from_secs(5);

/// Periodic chores that belong to no stage: AIS expiry, TCP statistics and
/// draining the command mailbox.
pub struct Housekeeping {
    store: Arc<VesselStateStore>,
    broadcaster: Arc<TcpBroadcaster>,
    actuation: ActuationStub,
    last_purge: Instant,
}

impl Housekeeping {
    pub fn new(
        store: Arc<VesselStateStore>,
        broadcaster: Arc<TcpBroadcaster>,
        mailbox: Arc<CommandMailbox>,
        now: Instant,
    ) -> Self {
        Self {
            store,
            broadcaster,
            actuation: ActuationStub::new(mailbox),
            last_purge: now,
        }
    }

    /// Returns the number of AIS targets purged on this tick.
    pub fn tick(&mut self, now: Instant) -> usize {
        let mut purged = 0;
        if now.saturating_duration_since(self.last_purge) >= AIS_PURGE_INTERVAL {
            self.last_purge = now;
            purged = self.store.purge_stale_ais(now);
            if purged > 0 {
                debug!("Purged {} stale AIS targets", purged);
            }
        }

        self.broadcaster.maybe_log_stats(now);
        while self.actuation.poll().is_some() {}
        purged
    }

    pub fn spawn(mut self, shutdown: Arc<AtomicBool>) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new().name("housekeeping".to_string()).spawn(move || {
            while !shutdown.load(Ordering::Relaxed) {
                self.tick(Instant::now());
                sleep_unless(&shutdown, HOUSEKEEPING_TICK);
            }
        })
    }
}

/// A running gateway.
pub struct Gateway {
    shutdown: Arc<AtomicBool>,
    store: Arc<VesselStateStore>,
    broadcaster: Arc<TcpBroadcaster>,
    table: Arc<CharacteristicTable>,
    mailbox: Arc<CommandMailbox>,
    metrics: SharedMetrics,
    reader: TransportReader,
    tcp_server: TcpServer,
    notifier: Option<BleNotifier>,
    web: Option<WebServer>,
    threads: Vec<JoinHandle<()>>,
}

impl Gateway {
    /// Start on the configured serial port.
    pub fn start(config: &Config) -> Result<Self> {
        let settings = config.uart_settings();
        Self::start_with_transport(config, move || {
            SerialTransport::open(&settings).map(|t| Box::new(t) as Box<dyn Transport>)
        })
    }

    /// Start with any byte source; `open` is retried after transport errors.
    pub fn start_with_transport<F>(config: &Config, open: F) -> Result<Self>
    where
        F: FnMut() -> Result<Box<dyn Transport>> + Send + 'static,
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let started_at = Instant::now();

        let store = Arc::new(VesselStateStore::new(&config.state));
        let broadcaster = Arc::new(TcpBroadcaster::new(config.tcp.max_clients));
        let hub = Arc::new(StreamHub::new(STREAM_HUB_CAPACITY));
        let mailbox = Arc::new(CommandMailbox::new());
        let table = Arc::new(CharacteristicTable::new(&config.ble.device_name, Arc::clone(&mailbox)));
        let metrics: SharedMetrics = Arc::new(Mutex::new(AppMetrics::default()));

        // Listeners first, so a taken port fails before the pipeline starts
        let web_listener = if config.web.enabled {
            Some(server::bind(&config.web.listen_address())?)
        } else {
            None
        };
        let tcp_server = TcpServer::start(
            &config.tcp.listen_address(),
            Arc::clone(&broadcaster) as Arc<dyn TransportEventSink>,
            Arc::clone(&shutdown),
        )?;

        let (byte_tx, byte_rx) = crossbeam_channel::bounded::<Chunk>(BYTE_CHANNEL_CAPACITY);
        let reader = TransportReader::spawn(open, byte_tx, Arc::clone(&shutdown), REOPEN_DELAY)?;

        let notifier = if config.ble.enabled {
            Some(BleNotifier::spawn(
                Arc::clone(&store),
                Arc::clone(&table) as Arc<dyn NotificationSink>,
                config.ble.update_interval(),
                Arc::clone(&shutdown),
            )?)
        } else {
            None
        };

        let (work_tx, work_rx) = work_queue(config.pipeline.queue_capacity);
        let handler = VesselStateHandler::new(Arc::clone(&store));
        let sources = MetricsSources {
            reader: Some(reader.stats()),
            queue: work_tx.stats(),
            handler: handler.stats(),
            broadcaster: Arc::clone(&broadcaster),
            hub: Arc::clone(&hub),
            notifier: notifier.as_ref().map(|n| n.stats()),
            mailbox: Arc::clone(&mailbox),
        };

        let ingestion = IngestionStage::new(
            LineReader::new(byte_rx, config.pipeline.max_line_length),
            work_tx,
            Arc::clone(&broadcaster),
            Arc::clone(&hub),
            &config.pipeline,
            sources,
            Arc::clone(&metrics),
        );
        let processing = ProcessingStage::new(work_rx, handler);
        let housekeeping = Housekeeping::new(
            Arc::clone(&store),
            Arc::clone(&broadcaster),
            Arc::clone(&mailbox),
            started_at,
        );

        let threads = vec![
            processing.spawn(Arc::clone(&shutdown))?,
            ingestion.spawn(Arc::clone(&shutdown))?,
            housekeeping.spawn(Arc::clone(&shutdown))?,
        ];

        let web = match web_listener {
            Some(listener) => {
                let identity = HostIdentity::new()
                    .with_endpoint("tcp", tcp_server.local_addr())
                    .with_endpoint("web", listener.local_addr()?);
                let state = AppState {
                    store: Arc::clone(&store),
                    hub: Arc::clone(&hub),
                    table: Arc::clone(&table),
                    broadcaster: Arc::clone(&broadcaster),
                    metrics: Arc::clone(&metrics),
                    identity: Arc::new(identity),
                    started_at,
                };
                Some(WebServer::start(listener, state)?)
            }
            None => None,
        };

        info!(
            "Gateway running: TCP on {}, web {}, BLE notifications {}",
            tcp_server.local_addr(),
            web.as_ref().map_or("disabled".to_string(), |w| w.local_addr().to_string()),
            if notifier.is_some() { "enabled" } else { "disabled" }
        );

        Ok(Self {
            shutdown,
            store,
            broadcaster,
            table,
            mailbox,
            metrics,
            reader,
            tcp_server,
            notifier,
            web,
            threads,
        })
    }

    #[cfg(test)]
    pub fn store(&self) -> Arc<VesselStateStore> {
        Arc::clone(&self.store)
    }

    #[cfg(test)]
    pub fn broadcaster(&self) -> Arc<TcpBroadcaster> {
        Arc::clone(&self.broadcaster)
    }

    #[cfg(test)]
    pub fn characteristics(&self) -> Arc<CharacteristicTable> {
        Arc::clone(&self.table)
    }

    pub fn metrics(&self) -> AppMetrics {
        *self.metrics.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn tcp_address(&self) -> SocketAddr {
        self.tcp_server.local_addr()
    }

    /// Signal every thread to stop and wait for all of them.
    pub fn shutdown(self) {
        info!(
            "Shutting down gateway: {} TCP clients connected, {} AIS targets tracked",
            self.broadcaster.client_count(),
            self.store.ais_target_count()
        );
        self.shutdown.store(true, Ordering::Relaxed);

        if let Some(web) = self.web {
            web.stop();
        }
        self.reader.join();
        for handle in self.threads {
            join_stage(handle);
        }
        if let Some(notifier) = self.notifier {
            notifier.join();
        }
        self.tcp_server.join();

        if self.table.command_pending() {
            let counts = self.mailbox.counts();
            warn!(
                "Autopilot command still pending at shutdown ({} submitted, {} taken)",
                counts.submitted, counts.taken
            );
        }
        info!("Gateway '{}' stopped", self.table.device_name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_intake::{AdjustStep, AutopilotCommand};
    use crate::serial_transport::mock::ScriptedTransport;
    use crate::vessel_state::{AutopilotMode, AutopilotReport};
    use approx::assert_abs_diff_eq;
    use nmea0183::checksum::with_checksum;
    use std::io::{BufRead, BufReader};
    use std::net::TcpStream;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.tcp.bind_address = "127.0.0.1".to_string();
        config.tcp.port = 0;
        config.web.enabled = false;
        config.ble.update_interval_ms = 20;
        config.pipeline.line_timeout_ms = 20;
        config
    }

    fn wait_for(cond: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(3);
        while !cond() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        cond()
    }

    #[test]
    fn test_housekeeping_drains_commands() {
        let store = Arc::new(VesselStateStore::new(&crate::config::StateConfig::default()));
        let mailbox = Arc::new(CommandMailbox::new());
        let t = Instant::now();
        let mut housekeeping =
            Housekeeping::new(store, Arc::new(TcpBroadcaster::new(1)), Arc::clone(&mailbox), t);

        mailbox.submit(AutopilotCommand::Adjust(AdjustStep::PlusOne));
        assert_eq!(housekeeping.tick(t + Duration::from_secs(1)), 0);
        assert!(!mailbox.has_pending());
        assert_eq!(mailbox.counts().taken, 1);
    }

    #[test]
    fn test_end_to_end_serial_to_store_and_tcp() {
        let gga = with_checksum('$', "GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,");
        let hdt = with_checksum('$', "GPHDT,274.07,T");
        let script = format!("{}\r\n{}\r\n", gga, hdt);

        let gateway = Gateway::start_with_transport(&test_config(), move || {
            Ok(Box::new(ScriptedTransport::new(&[script.as_str()])) as Box<dyn Transport>)
        })
        .unwrap();

        let store = gateway.store();
        assert!(wait_for(|| store.heading().true_heading.updated_at.is_some()));
        assert_abs_diff_eq!(store.gps().latitude.value, 48.1173, epsilon = 1e-6);
        assert_abs_diff_eq!(store.gps().longitude.value, 11.516_666_7, epsilon = 1e-6);
        assert_abs_diff_eq!(store.heading().true_heading.value, 274.07);

        let table = gateway.characteristics();
        assert!(wait_for(|| table
            .value(crate::ble_notifier::BleTopic::Navigation)
            .is_some_and(|v| v.contains("\"lat\""))));

        gateway.shutdown();
    }

    #[test]
    fn test_tcp_client_gets_welcome_and_live_lines() {
        let hdt = with_checksum('$', "GPHDT,90.0,T");
        let (line_tx, line_rx) = crossbeam_channel::unbounded::<String>();

        // Bytes only flow once the test releases them, after the client is admitted
        let gateway = Gateway::start_with_transport(&test_config(), move || {
            let script = line_rx.recv().unwrap_or_default();
            Ok(Box::new(ScriptedTransport::new(&[script.as_str()])) as Box<dyn Transport>)
        })
        .unwrap();

        let stream = TcpStream::connect(gateway.tcp_address()).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(3))).unwrap();
        let mut lines = BufReader::new(stream);

        let mut welcome = String::new();
        lines.read_line(&mut welcome).unwrap();
        assert_eq!(welcome, format!("{}\r\n", with_checksum('$', "PMAR,Marine Gateway Connected")));

        let broadcaster = gateway.broadcaster();
        assert!(wait_for(|| broadcaster.client_count() == 1));
        line_tx.send(format!("{}\r\n", hdt)).unwrap();

        let mut live = String::new();
        lines.read_line(&mut live).unwrap();
        assert_eq!(live, format!("{}\r\n", hdt));

        drop(lines);
        gateway.shutdown();
    }

    #[test]
    fn test_autopilot_state_reaches_notification() {
        let gateway = Gateway::start_with_transport(&test_config(), || {
            Ok(Box::new(ScriptedTransport::new(&[])) as Box<dyn Transport>)
        })
        .unwrap();

        let report = AutopilotReport {
            mode: Some(AutopilotMode::Auto),
            status: Some("engaged".to_string()),
            heading_target: Some(250.0),
            ..Default::default()
        };
        gateway.store().apply_autopilot_report(&report, Instant::now());
        let table = gateway.characteristics();
        assert!(wait_for(|| table
            .value(crate::ble_notifier::BleTopic::Autopilot)
            .is_some_and(|v| v.contains("\"auto\""))));

        gateway.shutdown();
    }
}
