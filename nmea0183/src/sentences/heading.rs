use std::fmt;

use crate::fields::parse_bearing;
use crate::sentence::Sentence;

/// HDT - true heading
#[derive(Debug, Clone, PartialEq)]
pub struct Hdt {
    pub heading: Option<f64>, // degrees, [0, 360)
}

/// HDM - magnetic heading
#[derive(Debug, Clone, PartialEq)]
pub struct Hdm {
    pub heading: Option<f64>, // degrees, [0, 360)
}

impl Hdt {
    pub fn from_sentence(s: &Sentence) -> Option<Self> {
        Some(Self { heading: parse_bearing(s.field(1)) })
    }
}

impl Hdm {
    pub fn from_sentence(s: &Sentence) -> Option<Self> {
        Some(Self { heading: parse_bearing(s.field(1)) })
    }
}

impl fmt::Display for Hdt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "      Heading: {:?}° (True)", self.heading)
    }
}

impl fmt::Display for Hdm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "      Heading: {:?}° (Magnetic)", self.heading)
    }
}
