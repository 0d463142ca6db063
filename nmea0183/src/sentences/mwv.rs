use std::fmt;

use crate::fields::{parse_char, parse_f64, speed_to_knots};
use crate::sentence::Sentence;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindReference {
    /// Relative to the bow (apparent)
    Relative,
    /// Theoretical, relative to the water
    True,
}

/// MWV - wind speed and angle
#[derive(Debug, Clone, PartialEq)]
pub struct Mwv {
    /// Status 'A'; invalid readings must not update wind
    pub active: bool,
    pub reference: Option<WindReference>,
    pub angle: Option<f64>, // degrees, [0, 360)
    pub speed: Option<f64>, // knots
}

impl Mwv {
    pub fn from_sentence(s: &Sentence) -> Option<Self> {
        let reference = match parse_char(s.field(2)) {
            Some('R') => Some(WindReference::Relative),
            Some('T') => Some(WindReference::True),
            _ => None,
        };
        let speed = parse_f64(s.field(3))
            .filter(|v| *v >= 0.0)
            .zip(parse_char(s.field(4)))
            .and_then(|(speed, unit)| speed_to_knots(speed, unit));

        Some(Self {
            active: parse_char(s.field(5)) == Some('A'),
            reference,
            angle: parse_f64(s.field(1)).filter(|a| (0.0..360.0).contains(a)),
            speed,
        })
    }
}

impl fmt::Display for Mwv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "      Wind ({:?}): {:?} kn at {:?}°{}",
            self.reference,
            self.speed,
            self.angle,
            if self.active { "" } else { " (invalid)" }
        )
    }
}
