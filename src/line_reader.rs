use std::collections::VecDeque;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use nmea0183::{FramerStats, LineFramer};

use crate::serial_transport::Chunk;

/// Consumer side of the byte channel: drains chunks into the framer and
/// hands out complete lines one at a time.
pub struct LineReader {
    rx: Receiver<Chunk>,
    framer: LineFramer,
    pending: VecDeque<String>,
    scratch: Vec<String>,
    closed: bool,
}

impl LineReader {
    pub fn new(rx: Receiver<Chunk>, max_line_length: usize) -> Self {
        Self {
            rx,
            framer: LineFramer::new(max_line_length),
            pending: VecDeque::new(),
            scratch: Vec::new(),
            closed: false,
        }
    }

    /// Next complete line, waiting at most `timeout` for bytes to arrive.
    pub fn read_line(&mut self, timeout: Duration) -> Option<String> {
        if let Some(line) = self.pending.pop_front() {
            return Some(line);
        }

        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(chunk) => {
                    self.framer.push_bytes(chunk.as_bytes(), &mut self.scratch);
                    self.pending.extend(self.scratch.drain(..));
                    if let Some(line) = self.pending.pop_front() {
                        return Some(line);
                    }
                }
                Err(RecvTimeoutError::Timeout) => return None,
                Err(RecvTimeoutError::Disconnected) => {
                    self.closed = true;
                    return None;
                }
            }
        }
    }

    pub fn stats(&self) -> FramerStats {
        self.framer.stats()
    }

    /// The transport side hung up; no more lines will arrive.
    pub fn is_closed(&self) -> bool {
        self.closed && self.pending.is_empty()
    }
}
