use std::fmt;

use super::armor::dearmor;
use super::position_report::PositionReport;
use super::static_data::StaticData;

/// A decoded AIS message.
#[derive(Debug, Clone, PartialEq)]
pub enum AisMessage {
    PositionReport(PositionReport),
    StaticData(StaticData),
    /// Type decoded far enough to identify it, then ignored
    Unsupported { message_type: u8, mmsi: Option<u32> },
}

impl AisMessage {
    /// Decode an armored single-sentence payload.
    ///
    /// Returns `None` when the payload contains characters outside the armoring
    /// alphabet or is too short to carry a message type.
    pub fn decode(payload: &str, fill_bits: u8) -> Option<Self> {
        let bits = dearmor(payload, fill_bits)?;
        let message_type = bits.read_u32(0, 6)? as u8;

        let decoded = match message_type {
            1..=3 | 18 => PositionReport::from_bits(&bits).map(AisMessage::PositionReport),
            5 | 24 => StaticData::from_bits(&bits).map(AisMessage::StaticData),
            _ => None,
        };

        Some(decoded.unwrap_or(AisMessage::Unsupported {
            message_type,
            mmsi: bits.read_u32(8, 30),
        }))
    }

    pub fn message_type(&self) -> u8 {
        match self {
            AisMessage::PositionReport(r) => r.message_type,
            AisMessage::StaticData(d) => d.message_type,
            AisMessage::Unsupported { message_type, .. } => *message_type,
        }
    }

    pub fn mmsi(&self) -> Option<u32> {
        match self {
            AisMessage::PositionReport(r) => Some(r.mmsi),
            AisMessage::StaticData(d) => Some(d.mmsi),
            AisMessage::Unsupported { mmsi, .. } => *mmsi,
        }
    }
}

impl fmt::Display for AisMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AisMessage::PositionReport(msg) => write!(f, "{}", msg),
            AisMessage::StaticData(msg) => write!(f, "{}", msg),
            AisMessage::Unsupported { message_type, mmsi } => {
                write!(f, "      AIS type {} from {:?} (ignored)", message_type, mmsi)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ais::armor::armor;
    use crate::ais::bit_reader::BitBuffer;
    use crate::ais::static_data::encode::type5;

    #[test]
    fn test_decode_position_report() {
        match AisMessage::decode("177KQJ5000G?tO`K>RA1wUbN0TKH", 0) {
            Some(AisMessage::PositionReport(r)) => assert_eq!(r.mmsi, 477553000),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_decode_static_data() {
        let (payload, fill) = armor(&type5(244_660_000, "NORDIC STAR"));
        let msg = AisMessage::decode(&payload, fill).unwrap();
        assert_eq!(msg.message_type(), 5);
        assert_eq!(msg.mmsi(), Some(244_660_000));
        match msg {
            AisMessage::StaticData(d) => assert_eq!(d.name, "NORDIC STAR"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_type_reports_tag() {
        let mut bits = BitBuffer::new();
        bits.push(4, 6); // base station report
        bits.push(0, 2);
        bits.push(2_320_001, 30);
        bits.push(0, 130);
        let (payload, fill) = armor(&bits);
        assert_eq!(
            AisMessage::decode(&payload, fill),
            Some(AisMessage::Unsupported { message_type: 4, mmsi: Some(2_320_001) })
        );
    }

    #[test]
    fn test_invalid_armor() {
        assert_eq!(AisMessage::decode("1~~", 0), None);
        assert_eq!(AisMessage::decode("", 0), None);
    }
}
