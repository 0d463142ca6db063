use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use nmea0183::ais::AisMessage;
use nmea0183::sentences::{Vdm, WindReference};
use nmea0183::{MessageHandler, NmeaMessage};

use crate::ais_targets::UpsertOutcome;
use crate::state_store::VesselStateStore;

/// Counters owned by the handler, shared with the metrics reporter.
#[derive(Debug, Default)]
pub struct HandlerStats {
    pub applied: AtomicU64,
    pub ignored: AtomicU64,
    pub ais_position_reports: AtomicU64,
    pub ais_static_reports: AtomicU64,
    pub ais_fragments_dropped: AtomicU64,
    pub ais_own_ship_skipped: AtomicU64,
    pub ais_unsupported: AtomicU64,
    pub ais_decode_errors: AtomicU64,
    pub ais_table_full: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandlerCounts {
    pub applied: u64,
    pub ignored: u64,
    pub ais_position_reports: u64,
    pub ais_static_reports: u64,
    pub ais_fragments_dropped: u64,
    pub ais_own_ship_skipped: u64,
    pub ais_unsupported: u64,
    pub ais_decode_errors: u64,
    pub ais_table_full: u64,
}

impl HandlerStats {
    pub fn counts(&self) -> HandlerCounts {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        HandlerCounts {
            applied: load(&self.applied),
            ignored: load(&self.ignored),
            ais_position_reports: load(&self.ais_position_reports),
            ais_static_reports: load(&self.ais_static_reports),
            ais_fragments_dropped: load(&self.ais_fragments_dropped),
            ais_own_ship_skipped: load(&self.ais_own_ship_skipped),
            ais_unsupported: load(&self.ais_unsupported),
            ais_decode_errors: load(&self.ais_decode_errors),
            ais_table_full: load(&self.ais_table_full),
        }
    }
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Applies decoded sentences to the vessel state store.
///
/// Absent fields never overwrite a previous value; void RMC/GLL fixes and
/// MWV readings without status 'A' leave the state untouched.
pub struct VesselStateHandler {
    store: Arc<VesselStateStore>,
    stats: Arc<HandlerStats>,
}

impl VesselStateHandler {
    pub fn new(store: Arc<VesselStateStore>) -> Self {
        Self {
            store,
            stats: Arc::new(HandlerStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<HandlerStats> {
        Arc::clone(&self.stats)
    }

    /// Returns true when the message touched the state.
    fn apply(&self, message: &NmeaMessage, at: Instant) -> bool {
        let store = &self.store;
        match message {
            NmeaMessage::Gga(gga) => {
                if let Some((lat, lon)) = gga.position {
                    store.set_position(lat, lon, at);
                }
                store.set_gps_fix(gga.fix_quality, gga.satellites, gga.hdop, at);
                true
            }
            NmeaMessage::Rmc(rmc) => {
                if !rmc.active {
                    return false;
                }
                if let Some((lat, lon)) = rmc.position {
                    store.set_position(lat, lon, at);
                }
                if let Some(sog) = rmc.sog {
                    store.set_sog(sog, at);
                }
                if let Some(cog) = rmc.cog {
                    store.set_cog(cog, at);
                }
                true
            }
            NmeaMessage::Gll(gll) => match gll.position {
                Some((lat, lon)) if gll.active => {
                    store.set_position(lat, lon, at);
                    true
                }
                _ => false,
            },
            NmeaMessage::Vtg(vtg) => {
                if let Some(cog) = vtg.cog_true {
                    store.set_cog(cog, at);
                }
                if let Some(sog) = vtg.sog {
                    store.set_sog(sog, at);
                }
                vtg.cog_true.is_some() || vtg.sog.is_some()
            }
            NmeaMessage::Hdt(hdt) => hdt.heading.map(|h| store.set_true_heading(h, at)).is_some(),
            NmeaMessage::Hdm(hdm) => hdm.heading.map(|h| store.set_magnetic_heading(h, at)).is_some(),
            NmeaMessage::Dpt(dpt) => match dpt.depth {
                Some(depth) => {
                    store.set_depth(depth, dpt.offset, at);
                    true
                }
                None => false,
            },
            NmeaMessage::Dbt(dbt) => dbt.depth.map(|d| store.set_depth(d, None, at)).is_some(),
            NmeaMessage::Mwv(mwv) => {
                let (Some(angle), Some(speed)) = (mwv.angle, mwv.speed) else {
                    return false;
                };
                if !mwv.active {
                    return false;
                }
                match mwv.reference {
                    Some(WindReference::Relative) => store.set_apparent_wind(speed, angle, at),
                    Some(WindReference::True) => store.set_true_wind(speed, angle, at),
                    None => return false,
                }
                true
            }
            NmeaMessage::Mwd(mwd) => match mwd.direction {
                Some(direction) => {
                    store.set_true_wind_direction(direction, mwd.speed, at);
                    true
                }
                None => false,
            },
            NmeaMessage::Mtw(mtw) => mtw.temperature.map(|t| store.set_water_temperature(t, at)).is_some(),
            NmeaMessage::Vhw(vhw) => {
                if let Some(h) = vhw.heading_true {
                    store.set_true_heading(h, at);
                }
                if let Some(h) = vhw.heading_magnetic {
                    store.set_magnetic_heading(h, at);
                }
                if let Some(stw) = vhw.stw {
                    store.set_stw(stw, at);
                }
                vhw.heading_true.is_some() || vhw.heading_magnetic.is_some() || vhw.stw.is_some()
            }
            NmeaMessage::Vlw(vlw) => {
                store.set_log(vlw.total, vlw.trip, at);
                vlw.total.is_some() || vlw.trip.is_some()
            }
            NmeaMessage::Ais(vdm) => self.apply_ais(vdm, at),
            NmeaMessage::Unknown(_) => false,
        }
    }

    fn apply_ais(&self, vdm: &Vdm, at: Instant) -> bool {
        if vdm.is_fragmented() {
            bump(&self.stats.ais_fragments_dropped);
            debug!(
                "Dropping AIS fragment {}/{} (no reassembly)",
                vdm.fragment_number, vdm.fragment_count
            );
            return false;
        }
        if vdm.own_ship {
            bump(&self.stats.ais_own_ship_skipped);
            return false;
        }

        match vdm.decode() {
            Some(AisMessage::PositionReport(report)) => {
                bump(&self.stats.ais_position_reports);
                match self.store.upsert_ais_target(&report, at) {
                    UpsertOutcome::Dropped => {
                        bump(&self.stats.ais_table_full);
                        false
                    }
                    _ => true,
                }
            }
            Some(AisMessage::StaticData(data)) => {
                bump(&self.stats.ais_static_reports);
                self.store.update_ais_name(data.mmsi, &data.name)
            }
            Some(AisMessage::Unsupported { message_type, .. }) => {
                bump(&self.stats.ais_unsupported);
                debug!("Ignoring AIS message type {}", message_type);
                false
            }
            None => {
                bump(&self.stats.ais_decode_errors);
                false
            }
        }
    }
}

impl MessageHandler for VesselStateHandler {
    fn handle_message(&mut self, message: &NmeaMessage, timestamp: Instant) {
        if self.apply(message, timestamp) {
            bump(&self.stats.applied);
        } else {
            bump(&self.stats.ignored);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StateConfig;
    use approx::assert_abs_diff_eq;
    use nmea0183::ais::armor::armor;
    use nmea0183::checksum::with_checksum;
    use nmea0183::Sentence;

    fn handler() -> (VesselStateHandler, Arc<VesselStateStore>) {
        let store = Arc::new(VesselStateStore::new(&StateConfig::default()));
        (VesselStateHandler::new(Arc::clone(&store)), store)
    }

    fn feed(handler: &mut VesselStateHandler, line: &str, at: Instant) {
        let sentence = Sentence::parse(line).unwrap();
        handler.handle_message(&NmeaMessage::from_sentence(&sentence), at);
    }

    fn body_line(sentinel: char, body: &str) -> String {
        with_checksum(sentinel, body)
    }

    #[test]
    fn test_gga_updates_position_and_fix() {
        let (mut handler, store) = handler();
        let t = Instant::now();
        feed(&mut handler, "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47", t);

        let nav = store.get_navigation_at(t);
        assert_abs_diff_eq!(nav.latitude.value.unwrap(), 48.1173, epsilon = 1e-4);
        assert_abs_diff_eq!(nav.longitude.value.unwrap(), 11.516_667, epsilon = 1e-4);
        assert_eq!(nav.satellites.value, Some(8.0));
        assert_eq!(nav.fix_quality.value, Some(1.0));
        assert_eq!(handler.stats().counts().applied, 1);
    }

    #[test]
    fn test_void_rmc_is_ignored() {
        let (mut handler, store) = handler();
        let t = Instant::now();
        let line = body_line('$', "GPRMC,123519,V,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W");
        feed(&mut handler, &line, t);
        assert_eq!(store.get_navigation_at(t).latitude.value, None);
        assert_eq!(handler.stats().counts().ignored, 1);
    }

    #[test]
    fn test_active_rmc_sets_sog_and_cog() {
        let (mut handler, store) = handler();
        let t = Instant::now();
        let line = body_line('$', "GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W");
        feed(&mut handler, &line, t);
        let nav = store.get_navigation_at(t);
        assert_eq!(nav.sog.value, Some(22.4));
        assert_eq!(nav.cog.value, Some(84.4));
    }

    #[test]
    fn test_mwv_relative_triggers_derived_wind() {
        let (mut handler, store) = handler();
        let t = Instant::now();
        feed(&mut handler, &body_line('$', "VWVHW,90.0,T,,M,5.0,N,,K"), t);
        feed(&mut handler, &body_line('$', "WIMWV,45.0,R,10.0,N,A"), t);

        let wind = store.get_wind_at(t);
        assert_abs_diff_eq!(wind.true_speed.value.unwrap(), 7.368_129, epsilon = 1e-3);
        assert_abs_diff_eq!(wind.true_angle.value.unwrap(), 73.675_050, epsilon = 1e-3);
        assert_abs_diff_eq!(wind.true_direction.value.unwrap(), 163.675_050, epsilon = 1e-3);
    }

    #[test]
    fn test_mwv_void_status_is_ignored() {
        let (mut handler, store) = handler();
        let t = Instant::now();
        feed(&mut handler, &body_line('$', "WIMWV,45.0,R,10.0,N,V"), t);
        assert_eq!(store.get_wind_at(t).apparent_speed.value, None);
    }

    #[test]
    fn test_mwv_speed_units() {
        let (mut handler, store) = handler();
        let t = Instant::now();
        feed(&mut handler, &body_line('$', "WIMWV,30.0,R,5.0,M,A"), t);
        assert_abs_diff_eq!(
            store.get_wind_at(t).apparent_speed.value.unwrap(),
            5.0 * 1.94384,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_empty_fields_do_not_overwrite() {
        let (mut handler, store) = handler();
        let t = Instant::now();
        feed(&mut handler, &body_line('$', "VWVHW,90.0,T,,M,5.0,N,,K"), t);
        feed(&mut handler, &body_line('$', "VWVHW,,T,,M,,N,,K"), t);
        assert_eq!(store.speed().stw.value, 5.0);
        assert_eq!(store.heading().true_heading.value, 90.0);
    }

    #[test]
    fn test_depth_and_temperature() {
        let (mut handler, store) = handler();
        let t = Instant::now();
        feed(&mut handler, &body_line('$', "SDDPT,7.5,0.4"), t);
        feed(&mut handler, &body_line('$', "YXMTW,18.5,C"), t);
        let state = store.get_full_state_at(t);
        assert_eq!(state.navigation.depth.value, Some(7.5));
        assert_eq!(state.depth_offset.value, Some(0.4));
        assert_eq!(state.environment.water_temperature.value, Some(18.5));
    }

    fn position_line(mmsi: u32, lat: f64, lon: f64) -> String {
        use nmea0183::ais::position_report::encode::{bits, Report};
        let report = Report { message_type: 1, mmsi, sog: 100, lon, lat, cog: 1800, heading: 511 };
        let (payload, fill) = armor(&bits(&report));
        body_line('!', &format!("AIVDM,1,1,,A,{},{}", payload, fill))
    }

    #[test]
    fn test_ais_position_then_name() {
        let (mut handler, store) = handler();
        let t = Instant::now();
        feed(&mut handler, &position_line(244_660_000, 52.0, 4.5), t);

        use nmea0183::ais::static_data::encode::type5;
        let (payload, fill) = armor(&type5(244_660_000, "NOORDZEE"));
        feed(&mut handler, &body_line('!', &format!("AIVDM,1,1,,B,{},{}", payload, fill)), t);

        let ais = store.get_ais_at(t);
        assert_eq!(ais.count, 1);
        assert_eq!(ais.targets[0].mmsi, 244_660_000);
        assert_eq!(ais.targets[0].name.as_deref(), Some("NOORDZEE"));
        assert_eq!(ais.targets[0].sog, Some(10.0));

        let counts = handler.stats().counts();
        assert_eq!(counts.ais_position_reports, 1);
        assert_eq!(counts.ais_static_reports, 1);
    }

    #[test]
    fn test_ais_name_alone_creates_nothing() {
        let (mut handler, store) = handler();
        use nmea0183::ais::static_data::encode::type5;
        let (payload, fill) = armor(&type5(1234, "GHOST"));
        feed(&mut handler, &body_line('!', &format!("AIVDM,1,1,,B,{},{}", payload, fill)), Instant::now());
        assert_eq!(store.ais_target_count(), 0);
    }

    #[test]
    fn test_ais_fragment_dropped_and_counted() {
        let (mut handler, store) = handler();
        let line = body_line('!', "AIVDM,2,1,3,B,55P5TL01VIaAL@7WKO@mBplU@<PDhh000000001S;AJ::4A80?4i@E53,0");
        feed(&mut handler, &line, Instant::now());
        assert_eq!(store.ais_target_count(), 0);
        assert_eq!(handler.stats().counts().ais_fragments_dropped, 1);
    }

    #[test]
    fn test_ais_own_ship_skipped() {
        let (mut handler, store) = handler();
        let line = position_line(1, 50.0, -4.0).replacen("AIVDM", "AIVDO", 1);
        // Checksum must be recomputed after the tag change
        let body = line[1..line.find('*').unwrap()].to_string();
        feed(&mut handler, &body_line('!', &body), Instant::now());
        assert_eq!(store.ais_target_count(), 0);
        assert_eq!(handler.stats().counts().ais_own_ship_skipped, 1);
    }

    #[test]
    fn test_ais_table_full_counted() {
        let config = StateConfig { max_ais_targets: 1, ..StateConfig::default() };
        let store = Arc::new(VesselStateStore::new(&config));
        let mut handler = VesselStateHandler::new(Arc::clone(&store));
        let t = Instant::now();
        feed(&mut handler, &position_line(1, 50.0, -4.0), t);
        feed(&mut handler, &position_line(2, 50.0, -4.0), t);
        assert_eq!(store.ais_target_count(), 1);
        assert_eq!(handler.stats().counts().ais_table_full, 1);
    }
}
