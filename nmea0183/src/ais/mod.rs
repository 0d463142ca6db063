//! AIS payload decoding.
//!
//! Payloads arrive armored as 6-bit ASCII inside `!AIVDM`/`!AIVDO` sentences.
//! [`armor`] turns them back into a packed bit buffer, [`bit_reader`] extracts
//! fixed-position fields and the message modules apply the ITU-R M.1371 layouts.

pub mod armor;
pub mod bit_reader;
pub mod message;
pub mod position_report;
pub mod static_data;

// Re-export commonly used types
pub use bit_reader::{read_bits, BitBuffer};
pub use message::AisMessage;
pub use position_report::PositionReport;
pub use static_data::StaticData;
