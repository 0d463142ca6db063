use std::fmt;

use crate::fields::{parse_bearing, parse_char, parse_f64, parse_latitude, parse_longitude};
use crate::sentence::Sentence;

/// RMC - recommended minimum navigation data
#[derive(Debug, Clone, PartialEq)]
pub struct Rmc {
    /// Status 'A'; a void fix carries no usable data
    pub active: bool,
    pub position: Option<(f64, f64)>,
    pub sog: Option<f64>, // knots
    pub cog: Option<f64>, // degrees true
}

impl Rmc {
    pub fn from_sentence(s: &Sentence) -> Option<Self> {
        let active = parse_char(s.field(2)) == Some('A');
        if !active {
            return Some(Self { active, position: None, sog: None, cog: None });
        }

        Some(Self {
            active,
            position: parse_latitude(s.field(3), s.field(4))
                .zip(parse_longitude(s.field(5), s.field(6))),
            sog: parse_f64(s.field(7)).filter(|v| *v >= 0.0),
            cog: parse_bearing(s.field(8)),
        })
    }
}

impl fmt::Display for Rmc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if !self.active {
            return write!(f, "      RMC: void");
        }
        if let Some((lat, lon)) = self.position {
            write!(f, "      Position: {:.6}°, {:.6}°", lat, lon)?;
        }
        if let Some(sog) = self.sog {
            write!(f, " | SOG: {:.1} kn", sog)?;
        }
        if let Some(cog) = self.cog {
            write!(f, " | COG: {:.1}°", cog)?;
        }
        Ok(())
    }
}
