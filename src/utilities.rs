//! Navigation math shared by the state store and the AIS enrichment

/// Below this relative speed (knots) CPA/TCPA are not meaningful.
pub const MIN_RELATIVE_SPEED_KN: f64 = 0.1;

const EARTH_RADIUS_NM: f64 = 3440.065;

/// True wind from apparent wind and speed through water.
///
/// Apparent wind and boat velocity are resolved in the boat frame (x to
/// starboard, y to the bow), the boat velocity subtracted, and the result
/// converted back to polar form.
///
/// # Arguments
/// * `apparent_wind_speed_kn` - Apparent wind speed in knots
/// * `apparent_wind_angle_deg` - Apparent wind angle in degrees (relative to bow)
/// * `boat_speed_kn` - Speed through water in knots
///
/// # Returns
/// Tuple of (true wind speed in knots, true wind angle in degrees, -180..=180)
pub fn calculate_true_wind(
    apparent_wind_speed_kn: f64,
    apparent_wind_angle_deg: f64,
    boat_speed_kn: f64,
) -> (f64, f64) {
    let awa_rad = apparent_wind_angle_deg.to_radians();
    let aws = apparent_wind_speed_kn;

    let aw_x = aws * awa_rad.sin();
    let aw_y = aws * awa_rad.cos();

    let tw_x = aw_x;
    let tw_y = aw_y - boat_speed_kn;

    let tw_speed = (tw_x.powi(2) + tw_y.powi(2)).sqrt();
    let tw_angle_deg = tw_x.atan2(tw_y).to_degrees();

    (tw_speed, tw_angle_deg)
}

/// Direction the true wind blows from, given the true wind angle and heading.
pub fn true_wind_direction(true_wind_angle_deg: f64, heading_deg: f64) -> f64 {
    normalize0_360(heading_deg + true_wind_angle_deg)
}

/// Velocity made good towards the wind.
pub fn calculate_vmg(boat_speed_kn: f64, apparent_wind_angle_deg: f64) -> f64 {
    boat_speed_kn * apparent_wind_angle_deg.to_radians().cos()
}

/// Current set and drift from the ground track minus the water track.
///
/// # Returns
/// Tuple of (drift in knots, set in degrees 0..360)
pub fn calculate_current(sog_kn: f64, cog_deg: f64, stw_kn: f64, heading_deg: f64) -> (f64, f64) {
    let (gx, gy) = velocity(sog_kn, cog_deg);
    let (wx, wy) = velocity(stw_kn, heading_deg);

    let dx = gx - wx;
    let dy = gy - wy;

    let drift = (dx.powi(2) + dy.powi(2)).sqrt();
    let set = normalize0_360(dx.atan2(dy).to_degrees());
    (drift, set)
}

/// Closest point of approach between own ship and a target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Approach {
    /// Nautical miles
    pub cpa: f64,
    /// Minutes; zero when the closest point is already behind
    pub tcpa: f64,
}

/// A vessel's position and ground track at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Track {
    pub latitude: f64,
    pub longitude: f64,
    pub sog: f64,
    pub cog: f64,
}

/// CPA/TCPA by linear extrapolation of the relative motion.
///
/// Positions are projected onto a local flat plane around own ship, which is
/// accurate over AIS reception ranges. Returns `None` when the relative speed
/// is at or below [`MIN_RELATIVE_SPEED_KN`]. A closest point already passed
/// reports the current distance with a TCPA of zero.
pub fn calculate_cpa(own: &Track, target: &Track) -> Option<Approach> {
    let (own_vx, own_vy) = velocity(own.sog, own.cog);
    let (tgt_vx, tgt_vy) = velocity(target.sog, target.cog);
    let vx = tgt_vx - own_vx;
    let vy = tgt_vy - own_vy;

    let rel_speed_sq = vx * vx + vy * vy;
    if rel_speed_sq.sqrt() <= MIN_RELATIVE_SPEED_KN {
        return None;
    }

    let mean_lat = ((own.latitude + target.latitude) / 2.0).to_radians();
    let px = (target.longitude - own.longitude) * 60.0 * mean_lat.cos();
    let py = (target.latitude - own.latitude) * 60.0;

    let tcpa_hours = -(px * vx + py * vy) / rel_speed_sq;
    if tcpa_hours < 0.0 {
        let distance =
            haversine_distance_nm(own.latitude, own.longitude, target.latitude, target.longitude);
        return Some(Approach { cpa: distance, tcpa: 0.0 });
    }

    let cx = px + vx * tcpa_hours;
    let cy = py + vy * tcpa_hours;
    Some(Approach {
        cpa: (cx * cx + cy * cy).sqrt(),
        tcpa: tcpa_hours * 60.0,
    })
}

fn velocity(speed: f64, course_deg: f64) -> (f64, f64) {
    let course = course_deg.to_radians();
    (speed * course.sin(), speed * course.cos())
}

pub fn normalize0_360(angle: f64) -> f64 {
    (angle % 360.0 + 360.0) % 360.0
}

/// Calculate the initial heading (bearing) from position1 to position2 using the haversine formula.
/// All lat/lon values are in degrees. Returns heading in degrees (0 = North, 90 = East).
pub fn haversine_heading(lat1_deg: f64, lon1_deg: f64, lat2_deg: f64, lon2_deg: f64) -> f64 {
    let lat1_rad = lat1_deg.to_radians();
    let lat2_rad = lat2_deg.to_radians();
    let dlon_rad = (lon2_deg - lon1_deg).to_radians();

    let y = dlon_rad.sin() * lat2_rad.cos();
    let x = lat1_rad.cos() * lat2_rad.sin() - lat1_rad.sin() * lat2_rad.cos() * dlon_rad.cos();
    normalize0_360(y.atan2(x).to_degrees())
}

pub fn haversine_distance_nm(lat1_deg: f64, lon1_deg: f64, lat2_deg: f64, lon2_deg: f64) -> f64 {
    let dlat_rad = (lat2_deg - lat1_deg).to_radians();
    let dlon_rad = (lon2_deg - lon1_deg).to_radians();

    let a = (dlat_rad / 2.0).sin().powi(2)
        + lat1_deg.to_radians().cos() * lat2_deg.to_radians().cos() * (dlon_rad / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_NM * c
}
