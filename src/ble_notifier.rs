//! Periodic notification channel (BLE GATT stand-in).
//!
//! The notifier pulls a snapshot from the state store on a fixed interval and
//! pushes one compact JSON document per topic. It never reads the sentence
//! stream. The [`CharacteristicTable`] keeps the last value of each topic and
//! fans notifications out to subscribers; its command characteristic feeds
//! the [`CommandMailbox`].

use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::command_intake::{AutopilotCommand, CommandError, CommandMailbox};
use crate::measurement::Measurement;
use crate::serial_transport::sleep_unless;
use crate::state_store::VesselStateStore;
use crate::vessel_state::{AutopilotMode, VesselState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BleTopic {
    Navigation,
    Wind,
    Autopilot,
}

impl BleTopic {
    pub const ALL: [BleTopic; 3] = [BleTopic::Navigation, BleTopic::Wind, BleTopic::Autopilot];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "navigation" => Some(Self::Navigation),
            "wind" => Some(Self::Wind),
            "autopilot" => Some(Self::Autopilot),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Navigation => "navigation",
            Self::Wind => "wind",
            Self::Autopilot => "autopilot",
        }
    }

    fn index(&self) -> usize {
        match self {
            Self::Navigation => 0,
            Self::Wind => 1,
            Self::Autopilot => 2,
        }
    }
}

/// Receiver of topic updates.
pub trait NotificationSink: Send + Sync {
    /// Store the topic value and notify subscribers; returns how many were notified.
    fn publish(&self, topic: BleTopic, payload: String) -> usize;

    fn subscriber_count(&self) -> usize;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub topic: BleTopic,
    pub payload: Arc<str>,
}

/// Host-side characteristic table.
pub struct CharacteristicTable {
    device_name: String,
    values: Mutex<[Option<Arc<str>>; 3]>,
    tx: broadcast::Sender<Notification>,
    mailbox: Arc<CommandMailbox>,
}

impl CharacteristicTable {
    pub fn new(device_name: &str, mailbox: Arc<CommandMailbox>) -> Self {
        let (tx, _) = broadcast::channel(32);
        Self {
            device_name: device_name.to_string(),
            values: Mutex::new([None, None, None]),
            tx,
            mailbox,
        }
    }

    fn lock(&self) -> MutexGuard<'_, [Option<Arc<str>>; 3]> {
        self.values.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Last value published on `topic`.
    pub fn value(&self, topic: BleTopic) -> Option<Arc<str>> {
        self.lock()[topic.index()].clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    /// Write to the command characteristic.
    pub fn write_command(&self, data: &[u8]) -> Result<AutopilotCommand, CommandError> {
        self.mailbox.submit_raw(data)
    }

    /// A written command is still waiting for the actuation side.
    pub fn command_pending(&self) -> bool {
        self.mailbox.has_pending()
    }
}

impl NotificationSink for CharacteristicTable {
    fn publish(&self, topic: BleTopic, payload: String) -> usize {
        let payload: Arc<str> = Arc::from(payload);
        self.lock()[topic.index()] = Some(Arc::clone(&payload));
        self.tx.send(Notification { topic, payload }).unwrap_or(0)
    }

    fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

// ========== Payloads ==========

#[derive(Serialize, Default)]
struct NavigationPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lon: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sog: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stw: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cog: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hdg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    depth: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sats: Option<u32>,
}

#[derive(Serialize, Default)]
struct WindPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    aws: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    awa: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tws: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    twa: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    twd: Option<f64>,
}

#[derive(Serialize)]
struct AutopilotPayload<'a> {
    mode: AutopilotMode,
    status: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rudder: Option<f64>,
}

fn round(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn to_json<T: Serialize>(payload: &T) -> String {
    serde_json::to_string(payload).unwrap_or_else(|_| "{}".to_string())
}

/// Compact navigation document; stale fields are left out.
pub fn navigation_payload(state: &VesselState, now: Instant, timeout: Duration) -> String {
    let fresh = |m: &Measurement, places| m.fresh_value(now, timeout).map(|v| round(v, places));
    to_json(&NavigationPayload {
        lat: fresh(&state.gps.latitude, 6),
        lon: fresh(&state.gps.longitude, 6),
        sog: fresh(&state.gps.sog, 1),
        stw: fresh(&state.speed.stw, 1),
        cog: fresh(&state.gps.cog, 1),
        hdg: fresh(&state.heading.magnetic_heading, 1),
        depth: fresh(&state.depth.depth, 1),
        sats: state.gps.satellites.fresh_value(now, timeout).map(|v| v as u32),
    })
}

pub fn wind_payload(state: &VesselState, now: Instant, timeout: Duration) -> String {
    let fresh = |m: &Measurement| m.fresh_value(now, timeout).map(|v| round(v, 1));
    to_json(&WindPayload {
        aws: fresh(&state.wind.apparent_speed),
        awa: fresh(&state.wind.apparent_angle),
        tws: fresh(&state.wind.true_speed),
        twa: fresh(&state.wind.true_angle),
        twd: fresh(&state.wind.true_direction),
    })
}

/// Empty document until the autopilot link has reported within `timeout`.
pub fn autopilot_payload(state: &VesselState, now: Instant, timeout: Duration) -> String {
    let ap = &state.autopilot;
    if !ap.is_fresh(now, timeout) {
        return "{}".to_string();
    }
    to_json(&AutopilotPayload {
        mode: ap.mode,
        status: &ap.status,
        target: ap.heading_target.fresh_value(now, timeout).map(|v| round(v, 1)),
        rudder: ap.rudder_angle.fresh_value(now, timeout).map(|v| round(v, 1)),
    })
}

#[derive(Debug, Default)]
pub struct NotifierStats {
    pub ticks: AtomicU64,
    /// Topic updates delivered to at least one subscriber
    pub notifications: AtomicU64,
}

/// One notification round: refresh every topic, count deliveries.
pub fn notify_once(
    store: &VesselStateStore,
    sink: &dyn NotificationSink,
    stats: &NotifierStats,
    now: Instant,
) -> usize {
    stats.ticks.fetch_add(1, Ordering::Relaxed);
    let state = store.snapshot();
    let timeout = store.data_timeout();

    let mut delivered = 0;
    for topic in BleTopic::ALL {
        let payload = match topic {
            BleTopic::Navigation => navigation_payload(&state, now, timeout),
            BleTopic::Wind => wind_payload(&state, now, timeout),
            BleTopic::Autopilot => autopilot_payload(&state, now, timeout),
        };
        if sink.publish(topic, payload) > 0 {
            delivered += 1;
        }
    }
    stats.notifications.fetch_add(delivered as u64, Ordering::Relaxed);
    delivered
}

pub struct BleNotifier {
    handle: JoinHandle<()>,
    stats: Arc<NotifierStats>,
}

impl BleNotifier {
    pub fn spawn(
        store: Arc<VesselStateStore>,
        sink: Arc<dyn NotificationSink>,
        interval: Duration,
        shutdown: Arc<AtomicBool>,
    ) -> std::io::Result<Self> {
        let stats = Arc::new(NotifierStats::default());
        let thread_stats = Arc::clone(&stats);

        let handle = thread::Builder::new().name("ble-notifier".to_string()).spawn(move || {
            info!("BLE notifier running every {:?}", interval);
            while !shutdown.load(Ordering::Relaxed) {
                let delivered = notify_once(&store, sink.as_ref(), &thread_stats, Instant::now());
                if delivered > 0 {
                    debug!("Notified {} topics to {} subscribers", delivered, sink.subscriber_count());
                }
                sleep_unless(&shutdown, interval);
            }
            info!("BLE notifier stopped");
        })?;

        Ok(Self { handle, stats })
    }

    pub fn stats(&self) -> Arc<NotifierStats> {
        Arc::clone(&self.stats)
    }

    pub fn join(self) {
        if self.handle.join().is_err() {
            warn!("BLE notifier thread panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_intake::AdjustStep;
    use crate::config::StateConfig;
    use crate::vessel_state::AutopilotReport;

    fn store() -> Arc<VesselStateStore> {
        Arc::new(VesselStateStore::new(&StateConfig::default()))
    }

    #[test]
    fn test_navigation_payload_omits_stale_fields() {
        let store = store();
        let t0 = Instant::now();
        store.set_stw(5.24, t0);
        let t = t0 + Duration::from_secs(30);
        store.set_position(48.117_300_4, 11.516_666_7, t);
        store.set_gps_fix(Some(1), Some(8), None, t);

        let json: serde_json::Value =
            serde_json::from_str(&navigation_payload(&store.snapshot(), t, store.data_timeout())).unwrap();
        assert_eq!(json["lat"], 48.1173);
        assert_eq!(json["lon"], 11.516667);
        assert_eq!(json["sats"], 8);
        assert!(json.get("stw").is_none());
        assert!(json.get("depth").is_none());
    }

    #[test]
    fn test_empty_state_payloads() {
        let state = VesselState::new(20);
        let now = Instant::now();
        let timeout = Duration::from_secs(10);
        assert_eq!(navigation_payload(&state, now, timeout), "{}");
        assert_eq!(wind_payload(&state, now, timeout), "{}");
        assert_eq!(autopilot_payload(&state, now, timeout), "{}");
    }

    #[test]
    fn test_autopilot_payload_while_reported() {
        let store = store();
        let t = Instant::now();
        store.apply_autopilot_report(
            &AutopilotReport {
                mode: Some(AutopilotMode::Wind),
                status: Some("engaged".to_string()),
                heading_target: Some(245.04),
                wind_angle_target: Some(-40.0),
                ..AutopilotReport::default()
            },
            t,
        );
        let payload = |now| autopilot_payload(&store.snapshot(), now, store.data_timeout());

        let json: serde_json::Value = serde_json::from_str(&payload(t)).unwrap();
        assert_eq!(json["mode"], "wind");
        assert_eq!(json["status"], "engaged");
        assert_eq!(json["target"], 245.0);
        assert!(json.get("rudder").is_none());

        // Link silent for longer than the data timeout
        assert_eq!(payload(t + Duration::from_secs(11)), "{}");
    }

    #[test]
    fn test_table_keeps_values_without_subscribers() {
        let table = CharacteristicTable::new("MarineGateway", Arc::new(CommandMailbox::new()));
        let stats = NotifierStats::default();
        let store = store();
        store.set_apparent_wind(12.0, 35.0, Instant::now());

        assert_eq!(notify_once(&store, &table, &stats, Instant::now()), 0);
        let wind = table.value(BleTopic::Wind).unwrap();
        assert!(wind.contains("\"aws\":12.0"));
        assert_eq!(stats.notifications.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_subscriber_receives_all_topics() {
        let table = CharacteristicTable::new("MarineGateway", Arc::new(CommandMailbox::new()));
        let mut rx = table.subscribe();
        let stats = NotifierStats::default();

        assert_eq!(notify_once(&store(), &table, &stats, Instant::now()), 3);
        let topics: Vec<BleTopic> = (0..3).map(|_| rx.try_recv().unwrap().topic).collect();
        assert_eq!(topics, BleTopic::ALL.to_vec());
    }

    #[test]
    fn test_command_write_reaches_mailbox() {
        let mailbox = Arc::new(CommandMailbox::new());
        let table = CharacteristicTable::new("MarineGateway", Arc::clone(&mailbox));
        assert_eq!(
            table.write_command(br#"{"command":"adjust+10"}"#).unwrap(),
            AutopilotCommand::Adjust(AdjustStep::PlusTen)
        );
        assert!(table.write_command(br#"{"command":"nope"}"#).is_err());
        assert!(table.command_pending());
        assert_eq!(mailbox.take().unwrap().command, AutopilotCommand::Adjust(AdjustStep::PlusTen));
        assert!(!table.command_pending());
    }

    #[test]
    fn test_topic_parse() {
        for topic in BleTopic::ALL {
            assert_eq!(BleTopic::parse(topic.as_str()), Some(topic));
        }
        assert_eq!(BleTopic::parse("engine"), None);
    }

    #[test]
    fn test_notifier_thread_stops() {
        let table = Arc::new(CharacteristicTable::new("MarineGateway", Arc::new(CommandMailbox::new())));
        let shutdown = Arc::new(AtomicBool::new(false));
        let notifier = BleNotifier::spawn(
            store(),
            Arc::clone(&table) as Arc<dyn NotificationSink>,
            Duration::from_millis(10),
            Arc::clone(&shutdown),
        )
        .unwrap();

        let stats = notifier.stats();
        let deadline = Instant::now() + Duration::from_secs(2);
        while stats.ticks.load(Ordering::Relaxed) < 2 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        shutdown.store(true, Ordering::Relaxed);
        notifier.join();
        assert!(stats.ticks.load(Ordering::Relaxed) >= 2);
        assert!(table.value(BleTopic::Navigation).is_some());
    }
}
