use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::debug;

use nmea0183::ais::PositionReport;

use crate::ais_targets::{AisTarget, UpsertOutcome};
use crate::config::StateConfig;
use crate::utilities::{
    calculate_cpa, calculate_current, calculate_true_wind, calculate_vmg, haversine_distance_nm,
    haversine_heading, true_wind_direction, Track,
};
use crate::vessel_state::{
    AisView, AutopilotData, AutopilotReport, CalculatedData, DepthData, FullStateView, GpsData,
    HeadingData, NavigationView, SpeedData, VesselState, WindData, WindView,
};

/// Owner of the one vessel state of the process.
///
/// Every setter takes the lock once, mutates its related fields together and
/// stamps them with the caller's timestamp, so a reader never observes e.g. a
/// latitude without its longitude. Every getter returns a copy taken under
/// the same lock.
pub struct VesselStateStore {
    state: Mutex<VesselState>,
    data_timeout: Duration,
    ais_timeout: Duration,
}

impl VesselStateStore {
    pub fn new(config: &StateConfig) -> Self {
        Self {
            state: Mutex::new(VesselState::new(config.max_ais_targets)),
            data_timeout: config.data_timeout(),
            ais_timeout: config.ais_timeout(),
        }
    }

    pub fn data_timeout(&self) -> Duration {
        self.data_timeout
    }

    fn lock(&self) -> MutexGuard<'_, VesselState> {
        // A panicking writer leaves at worst one stale field behind
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ========== Setters ==========

    pub fn set_position(&self, latitude: f64, longitude: f64, at: Instant) {
        let mut s = self.lock();
        s.gps.latitude.set(latitude, at);
        s.gps.longitude.set(longitude, at);
    }

    pub fn set_sog(&self, sog: f64, at: Instant) {
        self.lock().gps.sog.set(sog, at);
    }

    pub fn set_cog(&self, cog: f64, at: Instant) {
        self.lock().gps.cog.set(cog, at);
    }

    /// Fix quality, satellites in use and HDOP from one fix report; absent
    /// fields leave the previous value untouched.
    pub fn set_gps_fix(
        &self,
        fix_quality: Option<u8>,
        satellites: Option<u8>,
        hdop: Option<f64>,
        at: Instant,
    ) {
        let mut s = self.lock();
        if let Some(q) = fix_quality {
            s.gps.fix_quality.set(q as f64, at);
        }
        if let Some(n) = satellites {
            s.gps.satellites.set(n as f64, at);
        }
        if let Some(h) = hdop {
            s.gps.hdop.set(h, at);
        }
    }

    pub fn set_true_heading(&self, heading: f64, at: Instant) {
        self.lock().heading.true_heading.set(heading, at);
    }

    pub fn set_magnetic_heading(&self, heading: f64, at: Instant) {
        self.lock().heading.magnetic_heading.set(heading, at);
    }

    pub fn set_stw(&self, stw: f64, at: Instant) {
        self.lock().speed.stw.set(stw, at);
    }

    pub fn set_depth(&self, depth: f64, offset: Option<f64>, at: Instant) {
        let mut s = self.lock();
        s.depth.depth.set(depth, at);
        if let Some(offset) = offset {
            s.depth.offset.set(offset, at);
        }
    }

    pub fn set_log(&self, total: Option<f64>, trip: Option<f64>, at: Instant) {
        let mut s = self.lock();
        if let Some(total) = total {
            s.speed.log_total.set(total, at);
        }
        if let Some(trip) = trip {
            s.speed.log_trip.set(trip, at);
        }
    }

    /// Apparent wind; derived quantities are recomputed under the same lock.
    pub fn set_apparent_wind(&self, speed: f64, angle: f64, at: Instant) {
        let mut s = self.lock();
        s.wind.apparent_speed.set(speed, at);
        s.wind.apparent_angle.set(angle, at);
        Self::derive(&mut s, at, self.data_timeout);
    }

    /// True wind relative to the bow, as reported by the instrument.
    pub fn set_true_wind(&self, speed: f64, angle: f64, at: Instant) {
        let mut s = self.lock();
        s.wind.true_speed.set(speed, at);
        s.wind.true_angle.set(angle, at);
        if let Some(heading) = s.heading.true_heading.fresh_value(at, self.data_timeout) {
            s.wind.true_direction.set(true_wind_direction(angle, heading), at);
        }
    }

    pub fn set_true_wind_direction(&self, direction: f64, speed: Option<f64>, at: Instant) {
        let mut s = self.lock();
        s.wind.true_direction.set(direction, at);
        if let Some(speed) = speed {
            s.wind.true_speed.set(speed, at);
        }
    }

    pub fn set_water_temperature(&self, celsius: f64, at: Instant) {
        self.lock().environment.water_temperature.set(celsius, at);
    }

    /// Apply one report from the autopilot link as a single update.
    pub fn apply_autopilot_report(&self, report: &AutopilotReport, at: Instant) {
        let mut s = self.lock();
        let ap = &mut s.autopilot;
        if let Some(mode) = report.mode {
            ap.mode = mode;
        }
        if let Some(status) = &report.status {
            ap.status = status.clone();
        }
        if let Some(h) = report.heading_target {
            ap.heading_target.set(h, at);
        }
        if let Some(a) = report.wind_angle_target {
            ap.wind_angle_target.set(a, at);
        }
        if let Some(r) = report.rudder_angle {
            ap.rudder_angle.set(r, at);
        }
        if let Some(xte) = report.cross_track_error {
            ap.cross_track_error.set(xte, at);
        }
        if let Some(alarm) = &report.alarm {
            ap.alarm = (!alarm.is_empty()).then(|| alarm.clone());
        }
        ap.updated_at = Some(at);
    }

    /// Recompute true wind, VMG and current from whatever inputs are fresh.
    pub fn calculate_derived_data(&self, at: Instant) {
        let mut s = self.lock();
        Self::derive(&mut s, at, self.data_timeout);
    }

    fn derive(s: &mut VesselState, at: Instant, timeout: Duration) {
        let fresh = |m: &crate::measurement::Measurement| m.fresh_value(at, timeout);

        let aws = fresh(&s.wind.apparent_speed);
        let awa = fresh(&s.wind.apparent_angle);
        let stw = fresh(&s.speed.stw);
        let heading = fresh(&s.heading.true_heading);
        let sog = fresh(&s.gps.sog);
        let cog = fresh(&s.gps.cog);

        // Speed, angle and direction move together or not at all
        if let (Some(aws), Some(awa), Some(stw), Some(heading)) = (aws, awa, stw, heading) {
            let (tws, twa) = calculate_true_wind(aws, awa, stw);
            s.wind.true_speed.set(tws, at);
            s.wind.true_angle.set(twa, at);
            s.wind.true_direction.set(true_wind_direction(twa, heading), at);
        }

        if let (Some(awa), Some(stw)) = (awa, stw) {
            s.calculated.vmg.set(calculate_vmg(stw, awa), at);
        }

        if let (Some(sog), Some(cog), Some(stw), Some(heading)) = (sog, cog, stw, heading) {
            let (drift, set) = calculate_current(sog, cog, stw, heading);
            s.calculated.current_drift.set(drift, at);
            s.calculated.current_set.set(set, at);
        }
    }

    // ========== AIS ==========

    /// Track a position report, enriching it against own ship.
    ///
    /// A target already tracked keeps its name.
    pub fn upsert_ais_target(&self, report: &PositionReport, at: Instant) -> UpsertOutcome {
        let mut s = self.lock();

        let mut target = AisTarget::new(report.mmsi, at);
        target.latitude = report.latitude;
        target.longitude = report.longitude;
        target.sog = report.sog;
        target.cog = report.cog;
        target.heading = report.heading;
        target.class_b = report.is_class_b();
        Self::enrich(&s, &mut target, at, self.data_timeout);

        let outcome = s.ais.upsert(target);
        if outcome == UpsertOutcome::Dropped {
            debug!("AIS table full ({}), dropped MMSI {}", s.ais.capacity(), report.mmsi);
        }
        outcome
    }

    /// Name from a static report; only applied to a target already tracked.
    pub fn update_ais_name(&self, mmsi: u32, name: &str) -> bool {
        self.lock().ais.update_name(mmsi, name)
    }

    /// Remove targets not heard from within the AIS timeout.
    pub fn purge_stale_ais(&self, now: Instant) -> usize {
        self.lock().ais.purge_stale(now, self.ais_timeout)
    }

    fn enrich(s: &VesselState, target: &mut AisTarget, at: Instant, timeout: Duration) {
        let own_lat = s.gps.latitude.fresh_value(at, timeout);
        let own_lon = s.gps.longitude.fresh_value(at, timeout);
        let (Some(own_lat), Some(own_lon)) = (own_lat, own_lon) else {
            return;
        };
        let (Some(lat), Some(lon)) = (target.latitude, target.longitude) else {
            return;
        };

        target.distance = Some(haversine_distance_nm(own_lat, own_lon, lat, lon));
        target.bearing = Some(haversine_heading(own_lat, own_lon, lat, lon));

        let own_sog = s.gps.sog.fresh_value(at, timeout);
        let own_cog = s.gps.cog.fresh_value(at, timeout);
        if let (Some(own_sog), Some(own_cog), Some(sog), Some(cog)) =
            (own_sog, own_cog, target.sog, target.cog)
        {
            let own = Track { latitude: own_lat, longitude: own_lon, sog: own_sog, cog: own_cog };
            let other = Track { latitude: lat, longitude: lon, sog, cog };
            if let Some(approach) = calculate_cpa(&own, &other) {
                target.cpa = Some(approach.cpa);
                target.tcpa = Some(approach.tcpa);
            }
        }
    }

    // ========== Getters ==========

    pub fn gps(&self) -> GpsData {
        self.lock().gps
    }

    pub fn heading(&self) -> HeadingData {
        self.lock().heading
    }

    pub fn speed(&self) -> SpeedData {
        self.lock().speed
    }

    pub fn depth(&self) -> DepthData {
        self.lock().depth
    }

    pub fn wind(&self) -> WindData {
        self.lock().wind
    }

    pub fn calculated(&self) -> CalculatedData {
        self.lock().calculated
    }

    pub fn autopilot(&self) -> AutopilotData {
        self.lock().autopilot.clone()
    }

    pub fn ais_target_count(&self) -> usize {
        self.lock().ais.len()
    }

    /// Full copy of the state at one instant.
    pub fn snapshot(&self) -> VesselState {
        self.lock().clone()
    }

    pub fn get_navigation(&self) -> NavigationView {
        self.get_navigation_at(Instant::now())
    }

    pub fn get_navigation_at(&self, now: Instant) -> NavigationView {
        self.lock().navigation_view(now, self.data_timeout)
    }

    pub fn get_wind(&self) -> WindView {
        self.get_wind_at(Instant::now())
    }

    pub fn get_wind_at(&self, now: Instant) -> WindView {
        self.lock().wind_view(now, self.data_timeout)
    }

    pub fn get_ais(&self) -> AisView {
        self.get_ais_at(Instant::now())
    }

    pub fn get_ais_at(&self, now: Instant) -> AisView {
        self.lock().ais_view(now, self.ais_timeout)
    }

    pub fn get_full_state(&self) -> FullStateView {
        self.get_full_state_at(Instant::now())
    }

    pub fn get_full_state_at(&self, now: Instant) -> FullStateView {
        self.lock().full_view(now, self.data_timeout, self.ais_timeout)
    }
}
