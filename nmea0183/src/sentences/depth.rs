use std::fmt;

use crate::fields::parse_f64;
use crate::sentence::Sentence;

/// DPT - depth below transducer and transducer offset
#[derive(Debug, Clone, PartialEq)]
pub struct Dpt {
    pub depth: Option<f64>,  // metres
    pub offset: Option<f64>, // metres, positive = waterline, negative = keel
}

/// DBT - depth below transducer in feet, metres and fathoms
#[derive(Debug, Clone, PartialEq)]
pub struct Dbt {
    pub depth: Option<f64>, // metres
}

impl Dpt {
    pub fn from_sentence(s: &Sentence) -> Option<Self> {
        Some(Self {
            depth: parse_f64(s.field(1)).filter(|d| *d >= 0.0),
            offset: parse_f64(s.field(2)),
        })
    }
}

impl Dbt {
    pub fn from_sentence(s: &Sentence) -> Option<Self> {
        Some(Self { depth: parse_f64(s.field(3)).filter(|d| *d >= 0.0) })
    }
}

impl fmt::Display for Dpt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "      Depth: {:?} m | Offset: {:?} m", self.depth, self.offset)
    }
}

impl fmt::Display for Dbt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "      Depth: {:?} m", self.depth)
    }
}
