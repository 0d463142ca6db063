use std::fmt;

use super::bit_reader::BitBuffer;

const NAME_CHARS: usize = 20;
const TYPE5_NAME_OFFSET: usize = 112;
const TYPE24_NAME_OFFSET: usize = 40;

/// Vessel name from a type 5 (static and voyage data) or type 24 part A report.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticData {
    pub message_type: u8,
    pub mmsi: u32,
    pub name: String,
}

impl StaticData {
    pub fn from_bits(bits: &BitBuffer) -> Option<Self> {
        let message_type = bits.read_u32(0, 6)? as u8;
        let name_offset = match message_type {
            5 => TYPE5_NAME_OFFSET,
            // Part B carries call sign and dimensions only
            24 if bits.read_u32(38, 2)? == 0 => TYPE24_NAME_OFFSET,
            _ => return None,
        };

        Some(Self {
            message_type,
            mmsi: bits.read_u32(8, 30)?,
            name: bits.read_text(name_offset, NAME_CHARS)?,
        })
    }
}

impl fmt::Display for StaticData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "      AIS {} name: {}", self.mmsi, self.name)
    }
}

/// Encoders for synthetic static reports.
pub mod encode {
    use super::*;

    fn push_text(b: &mut BitBuffer, text: &str, chars: usize) {
        let mut padded: Vec<u8> = text.bytes().take(chars).collect();
        padded.resize(chars, b'@');
        for c in padded {
            let v = if c >= 64 { c - 64 } else { c };
            b.push(v as u32, 6);
        }
    }

    pub fn type5(mmsi: u32, name: &str) -> BitBuffer {
        let mut b = BitBuffer::new();
        b.push(5, 6);
        b.push(0, 2);
        b.push(mmsi, 30);
        b.push(0, 2); // ais version
        b.push(9_876_543, 30); // imo
        push_text(&mut b, "CALL", 7);
        push_text(&mut b, name, NAME_CHARS);
        b.push(0, 424 - 232);
        b
    }

    pub fn type24(mmsi: u32, part: u32, name: &str) -> BitBuffer {
        let mut b = BitBuffer::new();
        b.push(24, 6);
        b.push(0, 2);
        b.push(mmsi, 30);
        b.push(part, 2);
        push_text(&mut b, name, NAME_CHARS);
        b
    }
}
