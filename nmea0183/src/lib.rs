//! NMEA 0183 Protocol Library
//!
//! This library provides the wire-level pieces of a marine instrument gateway:
//! - Line framing of a raw serial byte stream into bounded sentences
//! - Checksum validation and sentence type classification
//! - Field decoders for the common navigation, wind and environment sentences
//! - AIS (`!AIVDM`/`!AIVDO`) payload de-armoring and bit-field extraction
//! - Message handler trait for components consuming decoded sentences
//!
//! # Example
//!
//! ```
//! use nmea0183::{LineFramer, Sentence, NmeaMessage};
//!
//! let mut framer = LineFramer::new(86);
//! let mut lines = Vec::new();
//! for &b in b"$GPHDT,274.07,T*03\r\n" {
//!     if let Some(line) = framer.push_byte(b) {
//!         lines.push(line);
//!     }
//! }
//!
//! let sentence = Sentence::parse(&lines[0]).unwrap();
//! assert!(sentence.checksum_ok);
//! match NmeaMessage::from_sentence(&sentence) {
//!     NmeaMessage::Hdt(hdt) => assert_eq!(hdt.heading, Some(274.07)),
//!     _ => unreachable!(),
//! }
//! ```

pub mod ais;
pub mod checksum;
pub mod fields;
pub mod line_framer;
pub mod message_handler;
pub mod sentence;
pub mod sentences;

// Re-export commonly used types
pub use ais::AisMessage;
pub use line_framer::{FramerStats, LineFramer};
pub use message_handler::MessageHandler;
pub use sentence::{Sentence, SentenceType};
pub use sentences::NmeaMessage;
