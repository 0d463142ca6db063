use std::fmt;

use super::bit_reader::BitBuffer;

const SOG_UNAVAILABLE: u32 = 1023;
const COG_UNAVAILABLE: u32 = 3600;
const HEADING_UNAVAILABLE: u32 = 511;
const COORD_SCALE: f64 = 600_000.0;

/// Bit offsets of the position fields within one report layout.
struct Layout {
    sog: usize,
    longitude: usize,
    latitude: usize,
    cog: usize,
    heading: usize,
}

/// Types 1, 2 and 3
const CLASS_A: Layout = Layout { sog: 50, longitude: 61, latitude: 89, cog: 116, heading: 128 };
/// Type 18
const CLASS_B: Layout = Layout { sog: 46, longitude: 57, latitude: 85, cog: 112, heading: 124 };

/// Class A or Class B position report; unavailable values are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionReport {
    pub message_type: u8,
    pub mmsi: u32,
    pub sog: Option<f64>,       // knots
    pub longitude: Option<f64>, // degrees
    pub latitude: Option<f64>,  // degrees
    pub cog: Option<f64>,       // degrees
    pub heading: Option<f64>,   // degrees true
}

impl PositionReport {
    pub fn from_bits(bits: &BitBuffer) -> Option<Self> {
        let message_type = bits.read_u32(0, 6)? as u8;
        let layout = match message_type {
            1..=3 => &CLASS_A,
            18 => &CLASS_B,
            _ => return None,
        };

        let sog = bits.read_u32(layout.sog, 10)?;
        let lon = bits.read_i32(layout.longitude, 28)? as f64 / COORD_SCALE;
        let lat = bits.read_i32(layout.latitude, 27)? as f64 / COORD_SCALE;
        let cog = bits.read_u32(layout.cog, 12)?;
        let heading = bits.read_u32(layout.heading, 9)?;

        Some(Self {
            message_type,
            mmsi: bits.read_u32(8, 30)?,
            sog: (sog != SOG_UNAVAILABLE).then(|| sog as f64 / 10.0),
            longitude: (lon.abs() <= 180.0).then_some(lon),
            latitude: (lat.abs() <= 90.0).then_some(lat),
            cog: (cog < COG_UNAVAILABLE).then(|| cog as f64 / 10.0),
            heading: (heading != HEADING_UNAVAILABLE && heading < 360).then_some(heading as f64),
        })
    }

    pub fn position(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }

    pub fn is_class_b(&self) -> bool {
        self.message_type == 18
    }
}

impl fmt::Display for PositionReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "      AIS {} type {}", self.mmsi, self.message_type)?;
        if let Some((lat, lon)) = self.position() {
            write!(f, " | {:.5}°, {:.5}°", lat, lon)?;
        }
        if let Some(sog) = self.sog {
            write!(f, " | SOG {:.1} kn", sog)?;
        }
        if let Some(cog) = self.cog {
            write!(f, " | COG {:.1}°", cog)?;
        }
        Ok(())
    }
}

/// Encoders for synthetic position reports (simulators and tests).
pub mod encode {
    use super::*;

    pub struct Report {
        pub message_type: u8,
        pub mmsi: u32,
        pub sog: u32,
        pub lon: f64,
        pub lat: f64,
        pub cog: u32,
        pub heading: u32,
    }

    pub fn bits(r: &Report) -> BitBuffer {
        let lon = ((r.lon * COORD_SCALE).round() as i32) as u32 & 0x0fff_ffff;
        let lat = ((r.lat * COORD_SCALE).round() as i32) as u32 & 0x07ff_ffff;
        let mut b = BitBuffer::new();
        b.push(r.message_type as u32, 6);
        b.push(0, 2); // repeat
        b.push(r.mmsi, 30);
        if r.message_type == 18 {
            b.push(0, 8); // reserved
            b.push(r.sog, 10);
            b.push(0, 1); // accuracy
            b.push(lon, 28);
            b.push(lat, 27);
            b.push(r.cog, 12);
            b.push(r.heading, 9);
            b.push(0, 35); // timestamp, flags, radio
        } else {
            b.push(0, 4); // navigation status
            b.push(0x80, 8); // rate of turn unavailable
            b.push(r.sog, 10);
            b.push(0, 1); // accuracy
            b.push(lon, 28);
            b.push(lat, 27);
            b.push(r.cog, 12);
            b.push(r.heading, 9);
            b.push(0, 31); // timestamp, maneuver, raim, radio
        }
        b
    }
}
