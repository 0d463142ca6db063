use std::fmt;

use crate::fields::{parse_char, parse_f64};
use crate::sentence::Sentence;

/// Plausible sea water temperatures, Celsius
pub const MIN_WATER_TEMP_C: f64 = -10.0;
pub const MAX_WATER_TEMP_C: f64 = 50.0;

/// MTW - water temperature
#[derive(Debug, Clone, PartialEq)]
pub struct Mtw {
    pub temperature: Option<f64>, // Celsius
}

impl Mtw {
    pub fn from_sentence(s: &Sentence) -> Option<Self> {
        let temperature = parse_f64(s.field(1))
            .and_then(|t| match parse_char(s.field(2)) {
                Some('F') => Some((t - 32.0) * 5.0 / 9.0),
                Some('C') | None => Some(t),
                Some(_) => None,
            })
            .filter(|t| (MIN_WATER_TEMP_C..=MAX_WATER_TEMP_C).contains(t));

        Some(Self { temperature })
    }
}

impl fmt::Display for Mtw {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.temperature {
            Some(t) => write!(f, "      Water temperature: {:.1}°C", t),
            None => write!(f, "      Water temperature: out of range"),
        }
    }
}
