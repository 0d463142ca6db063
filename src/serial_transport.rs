//! Serial transport and the dedicated reader thread feeding the line reader.

use crossbeam_channel::{Sender, TrySendError};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::Read;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::{ParityMode, UartSettings};
use crate::error::{GatewayError, Result};

/// Largest read handed to the line reader in one piece.
pub const CHUNK_SIZE: usize = 128;
pub const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Byte source for the reader thread.
pub trait Transport: Send {
    /// Read into `buffer`; `Ok(0)` means the read timed out with no data.
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize>;

    fn describe(&self) -> String {
        "transport".to_string()
    }
}

pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    name: String,
}

impl SerialTransport {
    /// Open the UART with the persisted line settings.
    pub fn open(settings: &UartSettings) -> Result<Self> {
        let data_bits = match settings.data_bits {
            5 => DataBits::Five,
            6 => DataBits::Six,
            7 => DataBits::Seven,
            _ => DataBits::Eight,
        };
        let parity = match settings.parity {
            ParityMode::None => Parity::None,
            ParityMode::Even => Parity::Even,
            ParityMode::Odd => Parity::Odd,
        };
        let stop_bits = if settings.stop_bits == 2 { StopBits::Two } else { StopBits::One };

        let port = serialport::new(&settings.port, settings.baud_rate)
            .data_bits(data_bits)
            .parity(parity)
            .stop_bits(stop_bits)
            .flow_control(FlowControl::None)
            .timeout(READ_TIMEOUT)
            .open()?;

        info!(
            "Opened serial port {} at {} baud ({:?}/{:?}/{:?})",
            settings.port, settings.baud_rate, data_bits, parity, stop_bits
        );
        Ok(Self { port, name: settings.port.clone() })
    }
}

impl Transport for SerialTransport {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        match self.port.read(buffer) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            // Device unplugged
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Err(GatewayError::TransportClosed),
            Err(e) => Err(e.into()),
        }
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

/// Fixed-size unit passed through the byte channel; no per-read allocation.
#[derive(Clone, Copy)]
pub struct Chunk {
    data: [u8; CHUNK_SIZE],
    len: usize,
}

impl Chunk {
    pub fn empty() -> Self {
        Self { data: [0; CHUNK_SIZE], len: 0 }
    }

    /// Copies at most `CHUNK_SIZE` bytes.
    #[cfg(test)]
    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut chunk = Self::empty();
        let len = bytes.len().min(CHUNK_SIZE);
        chunk.data[..len].copy_from_slice(&bytes[..len]);
        chunk.len = len;
        chunk
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }
}

#[derive(Debug, Default)]
pub struct ReaderStats {
    pub bytes_read: AtomicU64,
    pub chunks: AtomicU64,
    /// Chunks lost because the line reader fell behind
    pub overruns: AtomicU64,
    pub read_errors: AtomicU64,
    pub opens: AtomicU64,
}

pub struct TransportReader {
    handle: JoinHandle<()>,
    stats: Arc<ReaderStats>,
}

impl TransportReader {
    /// Start the reader thread.
    ///
    /// `open` is called on start and again after every read error, waiting
    /// `reopen_delay` between failed attempts. Chunks are pushed without
    /// blocking; a full channel counts an overrun and the chunk is lost.
    pub fn spawn<F>(
        mut open: F,
        tx: Sender<Chunk>,
        shutdown: Arc<AtomicBool>,
        reopen_delay: Duration,
    ) -> std::io::Result<Self>
    where
        F: FnMut() -> Result<Box<dyn Transport>> + Send + 'static,
    {
        let stats = Arc::new(ReaderStats::default());
        let thread_stats = Arc::clone(&stats);

        let handle = thread::Builder::new().name("transport-reader".into()).spawn(move || {
            let stats = thread_stats;
            let mut transport: Option<Box<dyn Transport>> = None;

            while !shutdown.load(Ordering::Relaxed) {
                let Some(active) = transport.as_mut() else {
                    match open() {
                        Ok(t) => {
                            stats.opens.fetch_add(1, Ordering::Relaxed);
                            transport = Some(t);
                        }
                        Err(e) => {
                            warn!("Failed to open transport: {}; retrying in {:?}", e, reopen_delay);
                            sleep_unless(&shutdown, reopen_delay);
                        }
                    }
                    continue;
                };

                let mut chunk = Chunk::empty();
                match active.read(&mut chunk.data) {
                    Ok(0) => {}
                    Ok(n) => {
                        chunk.len = n;
                        stats.bytes_read.fetch_add(n as u64, Ordering::Relaxed);
                        match tx.try_send(chunk) {
                            Ok(()) => {
                                stats.chunks.fetch_add(1, Ordering::Relaxed);
                            }
                            Err(TrySendError::Full(_)) => {
                                stats.overruns.fetch_add(1, Ordering::Relaxed);
                            }
                            Err(TrySendError::Disconnected(_)) => {
                                debug!("Line reader gone, transport reader exiting");
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        stats.read_errors.fetch_add(1, Ordering::Relaxed);
                        warn!("Read error on {}: {}; reopening", active.describe(), e);
                        transport = None;
                    }
                }
            }
            info!("Transport reader stopped");
        })?;

        Ok(Self { handle, stats })
    }

    pub fn stats(&self) -> Arc<ReaderStats> {
        Arc::clone(&self.stats)
    }

    pub fn join(self) {
        if self.handle.join().is_err() {
            warn!("Transport reader thread panicked");
        }
    }
}

/// Sleep up to `total`, waking early once `flag` is set.
pub fn sleep_unless(flag: &AtomicBool, total: Duration) {
    let deadline = Instant::now() + total;
    while !flag.load(Ordering::Relaxed) {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        thread::sleep(remaining.min(Duration::from_millis(50)));
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::collections::VecDeque;

    /// Replays scripted reads, then times out forever.
    pub struct ScriptedTransport {
        reads: VecDeque<std::result::Result<Vec<u8>, ()>>,
    }

    impl ScriptedTransport {
        pub fn new(reads: &[&str]) -> Self {
            Self { reads: reads.iter().map(|r| Ok(r.as_bytes().to_vec())).collect() }
        }

        pub fn failing_after(reads: &[&str]) -> Self {
            let mut t = Self::new(reads);
            t.reads.push_back(Err(()));
            t
        }
    }

    impl Transport for ScriptedTransport {
        fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
            match self.reads.pop_front() {
                Some(Ok(bytes)) => {
                    let n = bytes.len().min(buffer.len());
                    buffer[..n].copy_from_slice(&bytes[..n]);
                    Ok(n)
                }
                Some(Err(())) => Err(GatewayError::TransportClosed),
                None => {
                    thread::sleep(Duration::from_millis(1));
                    Ok(0)
                }
            }
        }
    }
}
