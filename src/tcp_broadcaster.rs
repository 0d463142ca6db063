//! Multi-client TCP fan-out of the raw sentence stream.
//!
//! The broadcaster owns the client roster and never blocks on a peer: every
//! send is a non-blocking attempt, and a client that keeps refusing data is
//! evicted by [`EvictionPolicy`]. The accept/poll loop lives in [`TcpServer`]
//! and talks to the broadcaster only through [`TransportEvent`]s.

use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use nmea0183::checksum::with_checksum;

use crate::error::{GatewayError, Result};

pub const WELCOME_BODY: &str = "PMAR,Marine Gateway Connected";
pub const REJECT_BODY: &str = "PMAR,Server Full";
const STATS_INTERVAL: Duration = Duration::from_secs(30);
const ACCEPT_POLL: Duration = Duration::from_millis(20);

pub type ClientId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    /// Only this many bytes were accepted
    Partial(usize),
    /// Send buffer full; nothing written
    NotReady,
    Closed,
}

/// Write side of one connected client.
pub trait ClientSink: Send {
    fn try_send(&mut self, data: &[u8]) -> SendOutcome;
    fn peer(&self) -> String;
    fn close(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientRecord {
    pub connected_at: Instant,
    pub last_send_time: Instant,
    pub consecutive_failures: u32,
    pub total_sent: u64,
    pub total_skipped: u64,
}

impl ClientRecord {
    pub fn new(now: Instant) -> Self {
        Self {
            connected_at: now,
            last_send_time: now,
            consecutive_failures: 0,
            total_sent: 0,
            total_skipped: 0,
        }
    }

    fn record_success(&mut self, now: Instant) {
        self.consecutive_failures = 0;
        self.last_send_time = now;
        self.total_sent += 1;
    }

    fn record_failure(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.total_skipped += 1;
    }
}

/// Tiered eviction: a burst of refusals is tolerated, a stuck peer is not.
#[derive(Debug, Clone, Copy)]
pub struct EvictionPolicy {
    pub max_failures: u32,
    pub stall_timeout: Duration,
    pub slow_timeout: Duration,
    pub slow_failures: u32,
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self {
            max_failures: 100,
            stall_timeout: Duration::from_secs(30),
            slow_timeout: Duration::from_secs(10),
            slow_failures: 10,
        }
    }
}

impl EvictionPolicy {
    pub fn should_evict(&self, record: &ClientRecord, now: Instant) -> bool {
        let idle = now.saturating_duration_since(record.last_send_time);
        record.consecutive_failures > self.max_failures
            || idle > self.stall_timeout
            || (idle > self.slow_timeout && record.consecutive_failures > self.slow_failures)
    }
}

/// Connection lifecycle reported by a server loop.
pub enum TransportEvent {
    Connected { id: ClientId, sink: Box<dyn ClientSink> },
    DataReceived { id: ClientId, len: usize },
    Disconnected { id: ClientId },
    Error { id: ClientId, message: String },
}

pub trait TransportEventSink: Send + Sync {
    fn on_event(&self, event: TransportEvent);
}

#[derive(Debug, Default)]
pub struct BroadcasterStats {
    pub lines: AtomicU64,
    pub accepted: AtomicU64,
    pub rejected: AtomicU64,
    pub evicted: AtomicU64,
    pub disconnected: AtomicU64,
}

struct Client {
    id: ClientId,
    peer: String,
    sink: Box<dyn ClientSink>,
    record: ClientRecord,
}

/// Snapshot of one roster entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSummary {
    pub id: ClientId,
    pub peer: String,
    pub record: ClientRecord,
}

pub struct TcpBroadcaster {
    clients: Mutex<Vec<Client>>,
    max_clients: usize,
    policy: EvictionPolicy,
    stats: BroadcasterStats,
    last_stats_log: Mutex<Instant>,
}

impl TcpBroadcaster {
    pub fn new(max_clients: usize) -> Self {
        Self::with_policy(max_clients, EvictionPolicy::default())
    }

    pub fn with_policy(max_clients: usize, policy: EvictionPolicy) -> Self {
        Self {
            clients: Mutex::new(Vec::with_capacity(max_clients)),
            max_clients,
            policy,
            stats: BroadcasterStats::default(),
            last_stats_log: Mutex::new(Instant::now()),
        }
    }

    fn roster(&self) -> MutexGuard<'_, Vec<Client>> {
        self.clients.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Admit a new client, or notify and close it when the roster is full.
    pub fn admit(&self, id: ClientId, mut sink: Box<dyn ClientSink>, now: Instant) -> bool {
        let peer = sink.peer();
        let mut clients = self.roster();

        if clients.len() >= self.max_clients {
            let notice = format!("{}\r\n", with_checksum('$', REJECT_BODY));
            sink.try_send(notice.as_bytes());
            sink.close();
            self.stats.rejected.fetch_add(1, Ordering::Relaxed);
            warn!("Rejected {}: {} clients already connected", peer, clients.len());
            return false;
        }

        let welcome = format!("{}\r\n", with_checksum('$', WELCOME_BODY));
        if sink.try_send(welcome.as_bytes()) == SendOutcome::Closed {
            sink.close();
            return false;
        }
        clients.push(Client { id, peer: peer.clone(), sink, record: ClientRecord::new(now) });
        self.stats.accepted.fetch_add(1, Ordering::Relaxed);
        info!("Client {} connected ({}/{})", peer, clients.len(), self.max_clients);
        true
    }

    /// Drop a client whose peer went away. Unknown ids are ignored.
    pub fn remove(&self, id: ClientId) -> bool {
        let mut clients = self.roster();
        match clients.iter().position(|c| c.id == id) {
            Some(index) => {
                let mut client = clients.remove(index);
                client.sink.close();
                self.stats.disconnected.fetch_add(1, Ordering::Relaxed);
                info!("Client {} disconnected", client.peer);
                true
            }
            None => false,
        }
    }

    pub fn broadcast(&self, line: &str) -> usize {
        self.broadcast_at(line, Instant::now())
    }

    /// Send one line to every client; returns how many received all of it.
    pub fn broadcast_at(&self, line: &str, now: Instant) -> usize {
        let mut payload = String::with_capacity(line.len() + 2);
        payload.push_str(line);
        if !payload.ends_with("\r\n") {
            payload.push_str("\r\n");
        }
        self.stats.lines.fetch_add(1, Ordering::Relaxed);

        let mut clients = self.roster();
        let mut delivered = 0;
        clients.retain_mut(|client| {
            match client.sink.try_send(payload.as_bytes()) {
                SendOutcome::Sent => {
                    client.record.record_success(now);
                    delivered += 1;
                }
                SendOutcome::Partial(_) | SendOutcome::NotReady => {
                    client.record.record_failure();
                    debug!(
                        "Client {} not ready ({} consecutive)",
                        client.peer, client.record.consecutive_failures
                    );
                }
                SendOutcome::Closed => {
                    client.sink.close();
                    self.stats.disconnected.fetch_add(1, Ordering::Relaxed);
                    info!("Client {} closed during send", client.peer);
                    return false;
                }
            }

            if self.policy.should_evict(&client.record, now) {
                client.sink.close();
                self.stats.evicted.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "Evicting client {}: {} consecutive failures, last send {:?} ago",
                    client.peer,
                    client.record.consecutive_failures,
                    now.saturating_duration_since(client.record.last_send_time)
                );
                return false;
            }
            true
        });
        delivered
    }

    pub fn client_count(&self) -> usize {
        self.roster().len()
    }

    pub fn clients(&self) -> Vec<ClientSummary> {
        self.roster()
            .iter()
            .map(|c| ClientSummary { id: c.id, peer: c.peer.clone(), record: c.record })
            .collect()
    }

    pub fn stats(&self) -> &BroadcasterStats {
        &self.stats
    }

    /// Log a per-client summary at most once per interval.
    pub fn maybe_log_stats(&self, now: Instant) -> bool {
        {
            let mut last = self.last_stats_log.lock().unwrap_or_else(|p| p.into_inner());
            if now.saturating_duration_since(*last) < STATS_INTERVAL {
                return false;
            }
            *last = now;
        }

        let clients = self.clients();
        info!(
            "[TCP] {} clients, {} lines, {} evicted, {} rejected",
            clients.len(),
            self.stats.lines.load(Ordering::Relaxed),
            self.stats.evicted.load(Ordering::Relaxed),
            self.stats.rejected.load(Ordering::Relaxed)
        );
        for c in &clients {
            info!(
                "[TCP]   {}: sent={} skipped={} failures={} connected {:?}",
                c.peer,
                c.record.total_sent,
                c.record.total_skipped,
                c.record.consecutive_failures,
                now.saturating_duration_since(c.record.connected_at)
            );
        }
        true
    }
}

impl TransportEventSink for TcpBroadcaster {
    fn on_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::Connected { id, sink } => {
                self.admit(id, sink, Instant::now());
            }
            TransportEvent::DataReceived { id, len } => {
                // Transmit-only channel
                debug!("Ignoring {} bytes from client {}", len, id);
            }
            TransportEvent::Disconnected { id } => {
                self.remove(id);
            }
            TransportEvent::Error { id, message } => {
                warn!("Client {} error: {}", id, message);
                self.remove(id);
            }
        }
    }
}

/// Non-blocking socket as a [`ClientSink`].
pub struct TcpClientSink {
    stream: TcpStream,
    peer: String,
}

impl TcpClientSink {
    pub fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Self { stream, peer: peer.to_string() }
    }
}

impl ClientSink for TcpClientSink {
    fn try_send(&mut self, data: &[u8]) -> SendOutcome {
        match self.stream.write(data) {
            Ok(n) if n == data.len() => SendOutcome::Sent,
            Ok(0) => SendOutcome::Closed,
            Ok(n) => SendOutcome::Partial(n),
            Err(e) if e.kind() == ErrorKind::WouldBlock => SendOutcome::NotReady,
            Err(e) if e.kind() == ErrorKind::Interrupted => SendOutcome::NotReady,
            Err(_) => SendOutcome::Closed,
        }
    }

    fn peer(&self) -> String {
        self.peer.clone()
    }

    fn close(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

/// Accept loop for the broadcast port.
///
/// Also polls each accepted socket for reads so a peer that hangs up is
/// reported as [`TransportEvent::Disconnected`].
pub struct TcpServer {
    handle: JoinHandle<()>,
    local_addr: SocketAddr,
}

impl TcpServer {
    pub fn start(
        address: &str,
        events: Arc<dyn TransportEventSink>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self> {
        let bind_err = |source| GatewayError::Bind { address: address.to_string(), source };
        let listener = TcpListener::bind(address).map_err(bind_err)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;
        info!("TCP broadcast server listening on {}", local_addr);

        let handle = thread::Builder::new()
            .name("tcp-server".to_string())
            .spawn(move || Self::run(listener, events, shutdown))?;

        Ok(Self { handle, local_addr })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn join(self) {
        if self.handle.join().is_err() {
            error!("TCP server thread panicked");
        }
    }

    fn run(listener: TcpListener, events: Arc<dyn TransportEventSink>, shutdown: Arc<AtomicBool>) {
        let mut next_id: ClientId = 1;
        let mut watched: Vec<(ClientId, TcpStream)> = Vec::new();
        let mut scratch = [0u8; 256];

        while !shutdown.load(Ordering::Relaxed) {
            loop {
                match listener.accept() {
                    Ok((stream, peer)) => {
                        let id = next_id;
                        next_id += 1;
                        if let Err(e) = Self::prepare(&stream) {
                            warn!("Failed to configure socket for {}: {}", peer, e);
                            continue;
                        }
                        match stream.try_clone() {
                            Ok(reader) => watched.push((id, reader)),
                            Err(e) => {
                                warn!("Failed to clone socket for {}: {}", peer, e);
                                continue;
                            }
                        }
                        events.on_event(TransportEvent::Connected {
                            id,
                            sink: Box::new(TcpClientSink::new(stream, peer)),
                        });
                    }
                    Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        break;
                    }
                }
            }

            watched.retain_mut(|(id, stream)| match stream.read(&mut scratch) {
                Ok(0) => {
                    events.on_event(TransportEvent::Disconnected { id: *id });
                    false
                }
                Ok(n) => {
                    events.on_event(TransportEvent::DataReceived { id: *id, len: n });
                    true
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => true,
                Err(e) => {
                    events.on_event(TransportEvent::Error { id: *id, message: e.to_string() });
                    false
                }
            });

            thread::sleep(ACCEPT_POLL);
        }

        for (id, _) in watched.drain(..) {
            events.on_event(TransportEvent::Disconnected { id });
        }
        info!("TCP broadcast server stopped");
    }

    fn prepare(stream: &TcpStream) -> std::io::Result<()> {
        stream.set_nonblocking(true)?;
        stream.set_nodelay(true)
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;

    #[derive(Debug, Default)]
    pub struct FakeState {
        pub written: Vec<u8>,
        pub ready: bool,
        pub partial: bool,
        pub closed: bool,
    }

    /// In-memory client whose readiness the test controls.
    pub struct FakeSink {
        pub state: Arc<Mutex<FakeState>>,
        pub name: String,
    }

    impl FakeSink {
        pub fn new(name: &str) -> (Box<dyn ClientSink>, Arc<Mutex<FakeState>>) {
            let state = Arc::new(Mutex::new(FakeState { ready: true, ..FakeState::default() }));
            let sink = FakeSink { state: Arc::clone(&state), name: name.to_string() };
            (Box::new(sink), state)
        }
    }

    impl ClientSink for FakeSink {
        fn try_send(&mut self, data: &[u8]) -> SendOutcome {
            let mut s = self.state.lock().unwrap();
            if s.closed {
                return SendOutcome::Closed;
            }
            if !s.ready {
                return SendOutcome::NotReady;
            }
            if s.partial {
                let n = data.len() / 2;
                s.written.extend_from_slice(&data[..n]);
                return SendOutcome::Partial(n);
            }
            s.written.extend_from_slice(data);
            SendOutcome::Sent
        }

        fn peer(&self) -> String {
            self.name.clone()
        }

        fn close(&mut self) {
            self.state.lock().unwrap().closed = true;
        }
    }
}
