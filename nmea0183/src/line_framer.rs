use tracing::debug;

/// Start sentinel for standard sentences.
pub const SENTINEL_STANDARD: u8 = b'$';
/// Start sentinel for encapsulated (AIS) sentences.
pub const SENTINEL_ENCAPSULATED: u8 = b'!';

/// Counters kept by the framer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FramerStats {
    /// Complete lines emitted
    pub lines_received: u64,
    /// Overflows, resyncs and invalid starts
    pub errors: u64,
}

/// Byte-at-a-time line framer.
///
/// Turns an unbounded byte stream into complete sentences:
/// - a line only begins at `$` or `!`; bytes received between lines are discarded
/// - a sentinel seen mid-line discards the partial buffer (counted as an error)
///   and starts a new line, recovering from a corrupted start without a terminator
/// - more than `max_len - 1` bytes without a terminator drops the partial line
///   (counted as an error) and waits for the next sentinel
/// - `\n` terminates a line; a preceding `\r` is stripped
pub struct LineFramer {
    buffer: Vec<u8>,
    max_len: usize,
    in_line: bool,
    stats: FramerStats,
}

impl LineFramer {
    /// Create a framer accepting lines of at most `max_len - 1` bytes (terminator excluded).
    pub fn new(max_len: usize) -> Self {
        let max_len = max_len.max(2);
        Self {
            buffer: Vec::with_capacity(max_len),
            max_len,
            in_line: false,
            stats: FramerStats::default(),
        }
    }

    /// Feed one byte; returns a complete line when `b` terminates one.
    pub fn push_byte(&mut self, b: u8) -> Option<String> {
        if b == SENTINEL_STANDARD || b == SENTINEL_ENCAPSULATED {
            if self.in_line && !self.buffer.is_empty() {
                self.stats.errors += 1;
                debug!("Framing resync, dropped {} byte partial line", self.buffer.len());
            }
            self.buffer.clear();
            self.buffer.push(b);
            self.in_line = true;
            return None;
        }

        if !self.in_line {
            return None;
        }

        if b == b'\n' {
            return self.finish_line();
        }

        if self.buffer.len() >= self.max_len - 1 {
            self.stats.errors += 1;
            debug!("Line exceeded {} bytes without terminator, dropped", self.max_len - 1);
            self.reset();
            return None;
        }

        self.buffer.push(b);
        None
    }

    /// Feed a chunk of bytes, collecting every line it completes.
    pub fn push_bytes(&mut self, bytes: &[u8], out: &mut Vec<String>) {
        for &b in bytes {
            if let Some(line) = self.push_byte(b) {
                out.push(line);
            }
        }
    }

    pub fn stats(&self) -> FramerStats {
        self.stats
    }

    /// True when a partial line is being assembled.
    pub fn is_mid_line(&self) -> bool {
        self.in_line
    }

    fn finish_line(&mut self) -> Option<String> {
        let mut end = self.buffer.len();
        if end > 0 && self.buffer[end - 1] == b'\r' {
            end -= 1;
        }

        let starts_ok = matches!(
            self.buffer.first(),
            Some(&SENTINEL_STANDARD) | Some(&SENTINEL_ENCAPSULATED)
        );
        let line = if starts_ok {
            String::from_utf8(self.buffer[..end].to_vec()).ok()
        } else {
            None
        };
        self.reset();

        match line {
            Some(line) => {
                self.stats.lines_received += 1;
                Some(line)
            }
            None => {
                self.stats.errors += 1;
                debug!("Invalid line start or encoding, dropped");
                None
            }
        }
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.in_line = false;
    }
}
