use std::fmt;

use crate::fields::{parse_f64, parse_latitude, parse_longitude, parse_u8};
use crate::sentence::Sentence;

/// GGA - GNSS fix data
#[derive(Debug, Clone, PartialEq)]
pub struct Gga {
    /// (latitude, longitude) in decimal degrees, present only with a fix
    pub position: Option<(f64, f64)>,
    pub fix_quality: Option<u8>,
    pub satellites: Option<u8>,
    pub hdop: Option<f64>,
    pub altitude: Option<f64>, // metres above MSL
}

impl Gga {
    pub fn from_sentence(s: &Sentence) -> Option<Self> {
        let fix_quality = parse_u8(s.field(6));
        let has_fix = fix_quality.is_some_and(|q| q > 0);
        let position = if has_fix {
            parse_latitude(s.field(2), s.field(3)).zip(parse_longitude(s.field(4), s.field(5)))
        } else {
            None
        };

        Some(Self {
            position,
            fix_quality,
            satellites: parse_u8(s.field(7)),
            hdop: parse_f64(s.field(8)),
            altitude: parse_f64(s.field(9)),
        })
    }
}

impl fmt::Display for Gga {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.position {
            Some((lat, lon)) => write!(f, "      Fix: {:.6}°, {:.6}°", lat, lon)?,
            None => write!(f, "      Fix: none")?,
        }
        if let Some(sats) = self.satellites {
            write!(f, " | Satellites: {}", sats)?;
        }
        if let Some(hdop) = self.hdop {
            write!(f, " | HDOP: {:.1}", hdop)?;
        }
        Ok(())
    }
}
