use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::ais_targets::{AisTargetTable, AisTargetView};
use crate::measurement::{Measurement, MeasurementView};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsData {
    pub latitude: Measurement,
    pub longitude: Measurement,
    pub sog: Measurement,
    pub cog: Measurement,
    pub satellites: Measurement,
    pub fix_quality: Measurement,
    pub hdop: Measurement,
}

impl Default for GpsData {
    fn default() -> Self {
        Self {
            latitude: Measurement::new("deg"),
            longitude: Measurement::new("deg"),
            sog: Measurement::new("kn"),
            cog: Measurement::new("deg"),
            satellites: Measurement::new("count"),
            fix_quality: Measurement::new("quality"),
            hdop: Measurement::new("hdop"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadingData {
    pub true_heading: Measurement,
    pub magnetic_heading: Measurement,
}

impl Default for HeadingData {
    fn default() -> Self {
        Self {
            true_heading: Measurement::new("deg"),
            magnetic_heading: Measurement::new("deg"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedData {
    /// Speed through water
    pub stw: Measurement,
    pub log_total: Measurement,
    pub log_trip: Measurement,
}

impl Default for SpeedData {
    fn default() -> Self {
        Self {
            stw: Measurement::new("kn"),
            log_total: Measurement::new("nm"),
            log_trip: Measurement::new("nm"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthData {
    /// Below transducer
    pub depth: Measurement,
    pub offset: Measurement,
}

impl Default for DepthData {
    fn default() -> Self {
        Self {
            depth: Measurement::new("m"),
            offset: Measurement::new("m"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindData {
    pub apparent_speed: Measurement,
    pub apparent_angle: Measurement,
    pub true_speed: Measurement,
    pub true_angle: Measurement,
    pub true_direction: Measurement,
}

impl Default for WindData {
    fn default() -> Self {
        Self {
            apparent_speed: Measurement::new("kn"),
            apparent_angle: Measurement::new("deg"),
            true_speed: Measurement::new("kn"),
            true_angle: Measurement::new("deg"),
            true_direction: Measurement::new("deg"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvironmentData {
    pub water_temperature: Measurement,
}

impl Default for EnvironmentData {
    fn default() -> Self {
        Self {
            water_temperature: Measurement::new("C"),
        }
    }
}

/// Quantities derived from the measured ones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalculatedData {
    pub vmg: Measurement,
    pub current_set: Measurement,
    pub current_drift: Measurement,
}

impl Default for CalculatedData {
    fn default() -> Self {
        Self {
            vmg: Measurement::new("kn"),
            current_set: Measurement::new("deg"),
            current_drift: Measurement::new("kn"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutopilotMode {
    #[default]
    Standby,
    Auto,
    Wind,
    Track,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AutopilotData {
    pub mode: AutopilotMode,
    /// Free-form status reported by the actuation side
    pub status: String,
    pub heading_target: Measurement,
    pub wind_angle_target: Measurement,
    pub rudder_angle: Measurement,
    pub cross_track_error: Measurement,
    pub alarm: Option<String>,
    pub updated_at: Option<Instant>,
}

impl Default for AutopilotData {
    fn default() -> Self {
        Self {
            mode: AutopilotMode::Standby,
            status: "unknown".to_string(),
            heading_target: Measurement::new("deg"),
            wind_angle_target: Measurement::new("deg"),
            rudder_angle: Measurement::new("deg"),
            cross_track_error: Measurement::new("nm"),
            alarm: None,
            updated_at: None,
        }
    }
}

impl AutopilotData {
    /// Something was reported within `timeout`.
    pub fn is_fresh(&self, now: Instant, timeout: Duration) -> bool {
        self.updated_at
            .is_some_and(|at| now.saturating_duration_since(at) <= timeout)
    }
}

/// Status pushed by the autopilot link. Absent fields keep their previous
/// value; an empty `alarm` clears the alarm.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AutopilotReport {
    pub mode: Option<AutopilotMode>,
    pub status: Option<String>,
    pub heading_target: Option<f64>,
    pub wind_angle_target: Option<f64>,
    pub rudder_angle: Option<f64>,
    pub cross_track_error: Option<f64>,
    pub alarm: Option<String>,
}

/// The whole vessel picture. One instance lives inside the state store.
#[derive(Debug, Clone)]
pub struct VesselState {
    pub gps: GpsData,
    pub heading: HeadingData,
    pub speed: SpeedData,
    pub depth: DepthData,
    pub wind: WindData,
    pub environment: EnvironmentData,
    pub calculated: CalculatedData,
    pub autopilot: AutopilotData,
    pub ais: AisTargetTable,
}

impl VesselState {
    pub fn new(max_ais_targets: usize) -> Self {
        Self {
            gps: GpsData::default(),
            heading: HeadingData::default(),
            speed: SpeedData::default(),
            depth: DepthData::default(),
            wind: WindData::default(),
            environment: EnvironmentData::default(),
            calculated: CalculatedData::default(),
            autopilot: AutopilotData::default(),
            ais: AisTargetTable::new(max_ais_targets),
        }
    }

    pub fn navigation_view(&self, now: Instant, timeout: Duration) -> NavigationView {
        let v = |m: &Measurement| m.view(now, timeout);
        NavigationView {
            latitude: v(&self.gps.latitude),
            longitude: v(&self.gps.longitude),
            sog: v(&self.gps.sog),
            cog: v(&self.gps.cog),
            stw: v(&self.speed.stw),
            heading_true: v(&self.heading.true_heading),
            heading_magnetic: v(&self.heading.magnetic_heading),
            depth: v(&self.depth.depth),
            satellites: v(&self.gps.satellites),
            fix_quality: v(&self.gps.fix_quality),
        }
    }

    pub fn wind_view(&self, now: Instant, timeout: Duration) -> WindView {
        let v = |m: &Measurement| m.view(now, timeout);
        WindView {
            apparent_speed: v(&self.wind.apparent_speed),
            apparent_angle: v(&self.wind.apparent_angle),
            true_speed: v(&self.wind.true_speed),
            true_angle: v(&self.wind.true_angle),
            true_direction: v(&self.wind.true_direction),
            vmg: v(&self.calculated.vmg),
        }
    }

    pub fn ais_view(&self, now: Instant, ais_timeout: Duration) -> AisView {
        let targets = self.ais.view(now, ais_timeout);
        AisView {
            count: targets.len(),
            capacity: self.ais.capacity(),
            targets,
        }
    }

    pub fn full_view(&self, now: Instant, timeout: Duration, ais_timeout: Duration) -> FullStateView {
        let v = |m: &Measurement| m.view(now, timeout);
        FullStateView {
            navigation: self.navigation_view(now, timeout),
            gps: GpsQualityView {
                hdop: v(&self.gps.hdop),
            },
            depth_offset: v(&self.depth.offset),
            log: LogView {
                total: v(&self.speed.log_total),
                trip: v(&self.speed.log_trip),
            },
            wind: self.wind_view(now, timeout),
            environment: EnvironmentView {
                water_temperature: v(&self.environment.water_temperature),
            },
            calculated: CalculatedView {
                vmg: v(&self.calculated.vmg),
                current_set: v(&self.calculated.current_set),
                current_drift: v(&self.calculated.current_drift),
            },
            autopilot: self.autopilot_view(now, timeout),
            ais: self.ais_view(now, ais_timeout),
        }
    }

    pub fn autopilot_view(&self, now: Instant, timeout: Duration) -> AutopilotView {
        let v = |m: &Measurement| m.view(now, timeout);
        let ap = &self.autopilot;
        AutopilotView {
            mode: ap.mode,
            status: ap.status.clone(),
            heading_target: v(&ap.heading_target),
            wind_angle_target: v(&ap.wind_angle_target),
            rudder_angle: v(&ap.rudder_angle),
            cross_track_error: v(&ap.cross_track_error),
            alarm: ap.alarm.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationView {
    pub latitude: MeasurementView,
    pub longitude: MeasurementView,
    pub sog: MeasurementView,
    pub cog: MeasurementView,
    pub stw: MeasurementView,
    pub heading_true: MeasurementView,
    pub heading_magnetic: MeasurementView,
    pub depth: MeasurementView,
    pub satellites: MeasurementView,
    pub fix_quality: MeasurementView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindView {
    pub apparent_speed: MeasurementView,
    pub apparent_angle: MeasurementView,
    pub true_speed: MeasurementView,
    pub true_angle: MeasurementView,
    pub true_direction: MeasurementView,
    pub vmg: MeasurementView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AisView {
    pub count: usize,
    pub capacity: usize,
    pub targets: Vec<AisTargetView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpsQualityView {
    pub hdop: MeasurementView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogView {
    pub total: MeasurementView,
    pub trip: MeasurementView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentView {
    pub water_temperature: MeasurementView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculatedView {
    pub vmg: MeasurementView,
    pub current_set: MeasurementView,
    pub current_drift: MeasurementView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutopilotView {
    pub mode: AutopilotMode,
    pub status: String,
    pub heading_target: MeasurementView,
    pub wind_angle_target: MeasurementView,
    pub rudder_angle: MeasurementView,
    pub cross_track_error: MeasurementView,
    pub alarm: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullStateView {
    pub navigation: NavigationView,
    pub gps: GpsQualityView,
    pub depth_offset: MeasurementView,
    pub log: LogView,
    pub wind: WindView,
    pub environment: EnvironmentView,
    pub calculated: CalculatedView,
    pub autopilot: AutopilotView,
    pub ais: AisView,
}
