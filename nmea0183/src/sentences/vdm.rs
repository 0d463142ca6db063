use std::fmt;

use crate::ais::AisMessage;
use crate::fields::{parse_u8, parse_char};
use crate::sentence::{Sentence, SentenceType};

/// VDM/VDO - encapsulated AIS radio message
#[derive(Debug, Clone, PartialEq)]
pub struct Vdm {
    /// VDO: the report describes our own vessel
    pub own_ship: bool,
    pub fragment_count: u8,
    pub fragment_number: u8,
    pub channel: Option<char>,
    pub payload: String,
    pub fill_bits: u8,
}

impl Vdm {
    pub fn from_sentence(s: &Sentence) -> Option<Self> {
        let fragment_count = parse_u8(s.field(1))?;
        let fragment_number = parse_u8(s.field(2)).unwrap_or(1);
        let payload = s.field(5);
        if payload.is_empty() {
            return None;
        }

        Some(Self {
            own_ship: s.sentence_type == SentenceType::Vdo,
            fragment_count,
            fragment_number,
            channel: parse_char(s.field(4)),
            payload: payload.to_string(),
            fill_bits: parse_u8(s.field(6)).filter(|b| *b <= 5).unwrap_or(0),
        })
    }

    /// Multi-sentence messages are not reassembled.
    pub fn is_fragmented(&self) -> bool {
        self.fragment_count > 1
    }

    /// Decode the armored payload of a single-sentence message.
    pub fn decode(&self) -> Option<AisMessage> {
        if self.is_fragmented() {
            return None;
        }
        AisMessage::decode(&self.payload, self.fill_bits)
    }
}

impl fmt::Display for Vdm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "      AIS {}/{} ch {:?}: {}",
            self.fragment_number, self.fragment_count, self.channel, self.payload
        )
    }
}
