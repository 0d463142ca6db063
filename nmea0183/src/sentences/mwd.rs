use std::fmt;

use crate::fields::{parse_bearing, parse_f64, KNOTS_PER_MPS};
use crate::sentence::Sentence;

/// MWD - true wind direction and speed
#[derive(Debug, Clone, PartialEq)]
pub struct Mwd {
    pub direction: Option<f64>, // degrees true
    pub speed: Option<f64>,     // knots
}

impl Mwd {
    pub fn from_sentence(s: &Sentence) -> Option<Self> {
        let speed = parse_f64(s.field(5))
            .or_else(|| parse_f64(s.field(7)).map(|mps| mps * KNOTS_PER_MPS))
            .filter(|v| *v >= 0.0);

        Some(Self { direction: parse_bearing(s.field(1)), speed })
    }
}

impl fmt::Display for Mwd {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "      True wind: {:?} kn from {:?}°", self.speed, self.direction)
    }
}
