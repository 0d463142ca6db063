use std::fmt;

use crate::fields::{parse_bearing, parse_f64, KNOTS_PER_KMH};
use crate::sentence::Sentence;

/// VTG - course and speed over ground
#[derive(Debug, Clone, PartialEq)]
pub struct Vtg {
    pub cog_true: Option<f64>,
    pub cog_magnetic: Option<f64>,
    pub sog: Option<f64>, // knots
}

impl Vtg {
    pub fn from_sentence(s: &Sentence) -> Option<Self> {
        // Knots field first, km/h only as a fallback
        let sog = parse_f64(s.field(5))
            .or_else(|| parse_f64(s.field(7)).map(|kmh| kmh * KNOTS_PER_KMH))
            .filter(|v| *v >= 0.0);

        Some(Self {
            cog_true: parse_bearing(s.field(1)),
            cog_magnetic: parse_bearing(s.field(3)),
            sog,
        })
    }
}

impl fmt::Display for Vtg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "      COG: {:?}° | SOG: {:?} kn", self.cog_true, self.sog)
    }
}
