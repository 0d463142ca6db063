use std::time::Instant;

use crate::sentences::NmeaMessage;

/// Trait for components that consume decoded NMEA 0183 messages
///
/// Handlers receive every decoded message and decide internally which ones
/// they're interested in, so the ingestion loop does not need to know which
/// component cares about which sentence.
pub trait MessageHandler {
    /// Process one decoded message received at `timestamp`
    fn handle_message(&mut self, message: &NmeaMessage, timestamp: Instant);
}
