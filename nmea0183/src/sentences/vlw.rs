use std::fmt;

use crate::fields::parse_f64;
use crate::sentence::Sentence;

/// VLW - distance travelled through water
#[derive(Debug, Clone, PartialEq)]
pub struct Vlw {
    pub total: Option<f64>, // nautical miles
    pub trip: Option<f64>,  // nautical miles
}

impl Vlw {
    pub fn from_sentence(s: &Sentence) -> Option<Self> {
        Some(Self {
            total: parse_f64(s.field(1)).filter(|v| *v >= 0.0),
            trip: parse_f64(s.field(3)).filter(|v| *v >= 0.0),
        })
    }
}

impl fmt::Display for Vlw {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "      Log: total {:?} nm | trip {:?} nm", self.total, self.trip)
    }
}
