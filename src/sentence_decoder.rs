use chrono::Utc;
use tracing::debug;

use nmea0183::{Sentence, SentenceType};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Checksum valid
    pub valid: u64,
    /// Missing sentinel, missing or misplaced delimiter, or mismatched checksum
    pub invalid: u64,
    /// Valid but not one of the decoded sentence types
    pub unsupported: u64,
}

/// Checksum gate in front of the work queue.
///
/// Only validates and classifies; field extraction and state updates happen
/// on the processing side.
#[derive(Default)]
pub struct SentenceDecoder {
    stats: DecoderStats,
}

impl SentenceDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate one framed line. The sentence is returned either way so a
    /// rejected line can still be forwarded verbatim.
    pub fn decode(&mut self, line: &str) -> (Sentence, bool) {
        let Some(sentence) = Sentence::parse(line) else {
            self.stats.invalid += 1;
            debug!("Rejected line without sentinel: {:?}", line);
            return (Sentence::unframed(line, Utc::now()), false);
        };

        if !sentence.checksum_ok {
            self.stats.invalid += 1;
            debug!("Checksum mismatch: {}", sentence.raw);
            return (sentence, false);
        }

        self.stats.valid += 1;
        if sentence.sentence_type == SentenceType::Unsupported {
            self.stats.unsupported += 1;
        }
        (sentence, true)
    }

    pub fn stats(&self) -> DecoderStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StateConfig;
    use crate::state_store::VesselStateStore;
    use crate::vessel_state_handler::VesselStateHandler;
    use nmea0183::{MessageHandler, NmeaMessage};
    use std::sync::Arc;
    use std::time::Instant;
    use approx::assert_abs_diff_eq;
    use nmea0183::checksum::calculate;
    use nmea0183::LineFramer;

    const GGA: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";

    #[test]
    fn test_accepts_valid_checksum() {
        let mut decoder = SentenceDecoder::new();
        let (sentence, accepted) = decoder.decode(GGA);
        assert!(accepted);
        assert_eq!(sentence.type_tag, "GPGGA");
        assert_eq!(decoder.stats().valid, 1);
    }

    #[test]
    fn test_checksum_matches_xor_for_every_value() {
        let body = "GPHDT,123.4,T";
        let expected = calculate(body.as_bytes());
        let mut decoder = SentenceDecoder::new();
        for hh in 0..=255u8 {
            let line = format!("${}*{:02X}", body, hh);
            let (_, accepted) = decoder.decode(&line);
            assert_eq!(accepted, hh == expected, "checksum {:02X}", hh);
        }
        assert_eq!(decoder.stats().valid, 1);
        assert_eq!(decoder.stats().invalid, 255);
    }

    #[test]
    fn test_rejects_missing_delimiter_and_sentinel() {
        let mut decoder = SentenceDecoder::new();
        assert!(!decoder.decode("$GPHDT,274.07,T").1);
        let (sentence, accepted) = decoder.decode("GPHDT,274.07,T*03");
        assert!(!accepted);
        assert_eq!(sentence.raw, "GPHDT,274.07,T*03");
        assert_eq!(decoder.stats().invalid, 2);
    }

    #[test]
    fn test_unsupported_type_counted_but_accepted() {
        let mut decoder = SentenceDecoder::new();
        let line = nmea0183::checksum::with_checksum('$', "GPZDA,201530.00,04,07,2002,00,00");
        let (sentence, accepted) = decoder.decode(&line);
        assert!(accepted);
        assert_eq!(sentence.sentence_type, SentenceType::Unsupported);
        assert_eq!(decoder.stats().unsupported, 1);
    }

    /// Framer, decoder and handler chained the way the two pipeline stages do.
    fn apply(decoder: &mut SentenceDecoder, handler: &mut VesselStateHandler, line: &str, at: Instant) -> bool {
        let (sentence, accepted) = decoder.decode(line);
        if accepted {
            handler.handle_message(&NmeaMessage::from_sentence(&sentence), at);
        }
        accepted
    }

    #[test]
    fn test_rejected_sentence_never_mutates_state() {
        let store = Arc::new(VesselStateStore::new(&StateConfig::default()));
        let mut handler = VesselStateHandler::new(Arc::clone(&store));
        let mut decoder = SentenceDecoder::new();
        assert!(!apply(&mut decoder, &mut handler, &GGA.replace("*47", "*48"), Instant::now()));
        assert_eq!(store.get_navigation().latitude.value, None);
    }

    #[test]
    fn test_end_to_end_gga() {
        let store = Arc::new(VesselStateStore::new(&StateConfig::default()));
        let mut handler = VesselStateHandler::new(Arc::clone(&store));
        let mut decoder = SentenceDecoder::new();
        let mut framer = LineFramer::new(86);

        let mut lines = Vec::new();
        framer.push_bytes(format!("{}\r\n", GGA).as_bytes(), &mut lines);
        assert_eq!(lines.len(), 1);
        let now = Instant::now();
        assert!(apply(&mut decoder, &mut handler, &lines[0], now));

        let nav = store.get_navigation_at(now);
        assert_abs_diff_eq!(nav.latitude.value.unwrap(), 48.1173, epsilon = 1e-4);
        assert_abs_diff_eq!(nav.longitude.value.unwrap(), 11.5167, epsilon = 1e-4);
        assert_eq!(nav.satellites.value, Some(8.0));
        assert_eq!(nav.fix_quality.value, Some(1.0));
        assert_eq!(nav.sog.value, None);
        assert_eq!(nav.cog.value, None);
        assert_eq!(nav.stw.value, None);
        assert_eq!(nav.heading_true.value, None);
        assert_eq!(nav.heading_magnetic.value, None);
        assert_eq!(nav.depth.value, None);
        assert_eq!(handler.stats().counts().applied, 1);
    }
}
