use std::fmt;

use crate::fields::{parse_bearing, parse_f64, KNOTS_PER_KMH};
use crate::sentence::Sentence;

/// VHW - water speed and heading
#[derive(Debug, Clone, PartialEq)]
pub struct Vhw {
    pub heading_true: Option<f64>,
    pub heading_magnetic: Option<f64>,
    pub stw: Option<f64>, // knots
}

impl Vhw {
    pub fn from_sentence(s: &Sentence) -> Option<Self> {
        let stw = parse_f64(s.field(5))
            .or_else(|| parse_f64(s.field(7)).map(|kmh| kmh * KNOTS_PER_KMH))
            .filter(|v| *v >= 0.0);

        Some(Self {
            heading_true: parse_bearing(s.field(1)),
            heading_magnetic: parse_bearing(s.field(3)),
            stw,
        })
    }
}

impl fmt::Display for Vhw {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "      STW: {:?} kn | Heading: {:?}°T {:?}°M",
            self.stw, self.heading_true, self.heading_magnetic
        )
    }
}
