use std::fmt;

use super::depth::{Dbt, Dpt};
use super::gga::Gga;
use super::gll::Gll;
use super::heading::{Hdm, Hdt};
use super::mtw::Mtw;
use super::mwd::Mwd;
use super::mwv::Mwv;
use super::rmc::Rmc;
use super::vdm::Vdm;
use super::vhw::Vhw;
use super::vlw::Vlw;
use super::vtg::Vtg;
use crate::sentence::{Sentence, SentenceType};

// Enum to hold any decoded sentence
#[derive(Debug, Clone, PartialEq)]
pub enum NmeaMessage {
    Gga(Gga),
    Rmc(Rmc),
    Gll(Gll),
    Vtg(Vtg),
    Hdt(Hdt),
    Hdm(Hdm),
    Dpt(Dpt),
    Dbt(Dbt),
    Mwv(Mwv),
    Mwd(Mwd),
    Mtw(Mtw),
    Vhw(Vhw),
    Vlw(Vlw),
    Ais(Vdm),
    Unknown(String),
}

impl NmeaMessage {
    /// Extract the typed fields of a sentence; unsupported or unparseable
    /// sentences become `Unknown` carrying their tag.
    pub fn from_sentence(s: &Sentence) -> Self {
        let unknown = || NmeaMessage::Unknown(s.type_tag.clone());
        match s.sentence_type {
            SentenceType::Gga => Gga::from_sentence(s).map(NmeaMessage::Gga).unwrap_or_else(unknown),
            SentenceType::Rmc => Rmc::from_sentence(s).map(NmeaMessage::Rmc).unwrap_or_else(unknown),
            SentenceType::Gll => Gll::from_sentence(s).map(NmeaMessage::Gll).unwrap_or_else(unknown),
            SentenceType::Vtg => Vtg::from_sentence(s).map(NmeaMessage::Vtg).unwrap_or_else(unknown),
            SentenceType::Hdt => Hdt::from_sentence(s).map(NmeaMessage::Hdt).unwrap_or_else(unknown),
            SentenceType::Hdm => Hdm::from_sentence(s).map(NmeaMessage::Hdm).unwrap_or_else(unknown),
            SentenceType::Dpt => Dpt::from_sentence(s).map(NmeaMessage::Dpt).unwrap_or_else(unknown),
            SentenceType::Dbt => Dbt::from_sentence(s).map(NmeaMessage::Dbt).unwrap_or_else(unknown),
            SentenceType::Mwv => Mwv::from_sentence(s).map(NmeaMessage::Mwv).unwrap_or_else(unknown),
            SentenceType::Mwd => Mwd::from_sentence(s).map(NmeaMessage::Mwd).unwrap_or_else(unknown),
            SentenceType::Mtw => Mtw::from_sentence(s).map(NmeaMessage::Mtw).unwrap_or_else(unknown),
            SentenceType::Vhw => Vhw::from_sentence(s).map(NmeaMessage::Vhw).unwrap_or_else(unknown),
            SentenceType::Vlw => Vlw::from_sentence(s).map(NmeaMessage::Vlw).unwrap_or_else(unknown),
            SentenceType::Vdm | SentenceType::Vdo => {
                Vdm::from_sentence(s).map(NmeaMessage::Ais).unwrap_or_else(unknown)
            }
            SentenceType::Unsupported => unknown(),
        }
    }
}

impl fmt::Display for NmeaMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NmeaMessage::Gga(msg) => write!(f, "{}", msg),
            NmeaMessage::Rmc(msg) => write!(f, "{}", msg),
            NmeaMessage::Gll(msg) => write!(f, "{}", msg),
            NmeaMessage::Vtg(msg) => write!(f, "{}", msg),
            NmeaMessage::Hdt(msg) => write!(f, "{}", msg),
            NmeaMessage::Hdm(msg) => write!(f, "{}", msg),
            NmeaMessage::Dpt(msg) => write!(f, "{}", msg),
            NmeaMessage::Dbt(msg) => write!(f, "{}", msg),
            NmeaMessage::Mwv(msg) => write!(f, "{}", msg),
            NmeaMessage::Mwd(msg) => write!(f, "{}", msg),
            NmeaMessage::Mtw(msg) => write!(f, "{}", msg),
            NmeaMessage::Vhw(msg) => write!(f, "{}", msg),
            NmeaMessage::Vlw(msg) => write!(f, "{}", msg),
            NmeaMessage::Ais(msg) => write!(f, "{}", msg),
            NmeaMessage::Unknown(tag) => write!(f, "      Unsupported sentence: {}", tag),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::with_checksum;
    use crate::sentences::mwv::WindReference;
    use approx::assert_abs_diff_eq;

    fn decode(body: &str) -> NmeaMessage {
        let sentinel = if body.starts_with("AIVD") { '!' } else { '$' };
        let line = with_checksum(sentinel, body);
        let sentence = Sentence::parse(&line).unwrap();
        assert!(sentence.checksum_ok);
        NmeaMessage::from_sentence(&sentence)
    }

    #[test]
    fn test_gga_with_fix() {
        match decode("GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,") {
            NmeaMessage::Gga(gga) => {
                let (lat, lon) = gga.position.unwrap();
                assert_abs_diff_eq!(lat, 48.1173, epsilon = 1e-4);
                assert_abs_diff_eq!(lon, 11.5167, epsilon = 1e-4);
                assert_eq!(gga.fix_quality, Some(1));
                assert_eq!(gga.satellites, Some(8));
                assert_eq!(gga.hdop, Some(0.9));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_gga_without_fix_has_no_position() {
        match decode("GPGGA,123519,4807.038,N,01131.000,E,0,00,,,M,,M,,") {
            NmeaMessage::Gga(gga) => {
                assert_eq!(gga.position, None);
                assert_eq!(gga.fix_quality, Some(0));
                assert_eq!(gga.satellites, Some(0));
                assert_eq!(gga.hdop, None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_rmc_active_and_void() {
        match decode("GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W") {
            NmeaMessage::Rmc(rmc) => {
                assert!(rmc.active);
                assert!(rmc.position.is_some());
                assert_eq!(rmc.sog, Some(22.4));
                assert_eq!(rmc.cog, Some(84.4));
            }
            other => panic!("unexpected {:?}", other),
        }
        match decode("GPRMC,123519,V,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W") {
            NmeaMessage::Rmc(rmc) => {
                assert!(!rmc.active);
                assert_eq!(rmc.position, None);
                assert_eq!(rmc.sog, None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_gll_requires_active_status() {
        match decode("GPGLL,4916.45,N,12311.12,W,225444,A") {
            NmeaMessage::Gll(gll) => {
                let (lat, lon) = gll.position.unwrap();
                assert_abs_diff_eq!(lat, 49.274_167, epsilon = 1e-5);
                assert_abs_diff_eq!(lon, -123.185_333, epsilon = 1e-5);
            }
            other => panic!("unexpected {:?}", other),
        }
        match decode("GPGLL,4916.45,N,12311.12,W,225444,V") {
            NmeaMessage::Gll(gll) => assert_eq!(gll.position, None),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_vtg() {
        match decode("GPVTG,054.7,T,034.4,M,005.5,N,010.2,K") {
            NmeaMessage::Vtg(vtg) => {
                assert_eq!(vtg.cog_true, Some(54.7));
                assert_eq!(vtg.cog_magnetic, Some(34.4));
                assert_eq!(vtg.sog, Some(5.5));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_heading_range() {
        match decode("HCHDM,359.9,M") {
            NmeaMessage::Hdm(hdm) => assert_eq!(hdm.heading, Some(359.9)),
            other => panic!("unexpected {:?}", other),
        }
        match decode("GPHDT,360.0,T") {
            NmeaMessage::Hdt(hdt) => assert_eq!(hdt.heading, None),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_depth_sentences() {
        match decode("SDDPT,12.5,0.3") {
            NmeaMessage::Dpt(dpt) => {
                assert_eq!(dpt.depth, Some(12.5));
                assert_eq!(dpt.offset, Some(0.3));
            }
            other => panic!("unexpected {:?}", other),
        }
        match decode("SDDPT,12.5,") {
            NmeaMessage::Dpt(dpt) => assert_eq!(dpt.offset, None),
            other => panic!("unexpected {:?}", other),
        }
        match decode("SDDBT,036.1,f,011.0,M,006.0,F") {
            NmeaMessage::Dbt(dbt) => assert_eq!(dbt.depth, Some(11.0)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_mwv_units_and_reference() {
        match decode("IIMWV,045.0,R,10.0,M,A") {
            NmeaMessage::Mwv(mwv) => {
                assert!(mwv.active);
                assert_eq!(mwv.reference, Some(WindReference::Relative));
                assert_eq!(mwv.angle, Some(45.0));
                assert_abs_diff_eq!(mwv.speed.unwrap(), 19.4384, epsilon = 1e-9);
            }
            other => panic!("unexpected {:?}", other),
        }
        match decode("IIMWV,270.0,T,20.0,K,A") {
            NmeaMessage::Mwv(mwv) => {
                assert_eq!(mwv.reference, Some(WindReference::True));
                assert_abs_diff_eq!(mwv.speed.unwrap(), 10.79914, epsilon = 1e-9);
            }
            other => panic!("unexpected {:?}", other),
        }
        match decode("IIMWV,045.0,R,10.0,N,V") {
            NmeaMessage::Mwv(mwv) => assert!(!mwv.active),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_mwd() {
        match decode("WIMWD,180.0,T,175.0,M,12.0,N,6.2,M") {
            NmeaMessage::Mwd(mwd) => {
                assert_eq!(mwd.direction, Some(180.0));
                assert_eq!(mwd.speed, Some(12.0));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_mtw_conversion_and_bounds() {
        match decode("YXMTW,68.0,F") {
            NmeaMessage::Mtw(mtw) => assert_abs_diff_eq!(mtw.temperature.unwrap(), 20.0, epsilon = 1e-9),
            other => panic!("unexpected {:?}", other),
        }
        match decode("YXMTW,18.5,C") {
            NmeaMessage::Mtw(mtw) => assert_eq!(mtw.temperature, Some(18.5)),
            other => panic!("unexpected {:?}", other),
        }
        match decode("YXMTW,85.0,C") {
            NmeaMessage::Mtw(mtw) => assert_eq!(mtw.temperature, None),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_vhw_and_vlw() {
        match decode("VWVHW,245.1,T,240.0,M,6.3,N,11.7,K") {
            NmeaMessage::Vhw(vhw) => {
                assert_eq!(vhw.heading_true, Some(245.1));
                assert_eq!(vhw.heading_magnetic, Some(240.0));
                assert_eq!(vhw.stw, Some(6.3));
            }
            other => panic!("unexpected {:?}", other),
        }
        match decode("VWVLW,1234.5,N,12.3,N") {
            NmeaMessage::Vlw(vlw) => {
                assert_eq!(vlw.total, Some(1234.5));
                assert_eq!(vlw.trip, Some(12.3));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_ais_sentence() {
        match decode("AIVDM,2,1,3,B,55P5TL01VIaAL@7WKO@mBplU@<PDhh000000001S;AJ::4A80?4i@E53,0") {
            NmeaMessage::Ais(vdm) => {
                assert!(vdm.is_fragmented());
                assert_eq!(vdm.decode(), None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_sentence() {
        assert_eq!(decode("GPGSV,3,1,11,03,03,111,00"), NmeaMessage::Unknown("GPGSV".to_string()));
    }
}
