use std::fmt;

use crate::fields::{parse_char, parse_latitude, parse_longitude};
use crate::sentence::Sentence;

/// GLL - geographic position
#[derive(Debug, Clone, PartialEq)]
pub struct Gll {
    pub active: bool,
    pub position: Option<(f64, f64)>,
}

impl Gll {
    pub fn from_sentence(s: &Sentence) -> Option<Self> {
        let active = parse_char(s.field(6)) == Some('A');
        let position = if active {
            parse_latitude(s.field(1), s.field(2)).zip(parse_longitude(s.field(3), s.field(4)))
        } else {
            None
        };
        Some(Self { active, position })
    }
}

impl fmt::Display for Gll {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.position {
            Some((lat, lon)) => write!(f, "      Position: {:.6}°, {:.6}°", lat, lon),
            None => write!(f, "      Position: void"),
        }
    }
}
