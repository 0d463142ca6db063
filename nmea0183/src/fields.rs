//! Field helpers shared by the sentence parsers.
//!
//! Every helper maps an empty or malformed field to `None` so that a missing
//! value is treated as "no update" rather than zero.

/// Knots per metre/second
pub const KNOTS_PER_MPS: f64 = 1.94384;
/// Knots per kilometre/hour
pub const KNOTS_PER_KMH: f64 = 0.539957;

pub fn parse_f64(field: &str) -> Option<f64> {
    let field = field.trim();
    if field.is_empty() {
        return None;
    }
    field.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_u8(field: &str) -> Option<u8> {
    let field = field.trim();
    if field.is_empty() {
        return None;
    }
    field.parse::<u8>().ok()
}

pub fn parse_u32(field: &str) -> Option<u32> {
    let field = field.trim();
    if field.is_empty() {
        return None;
    }
    field.parse::<u32>().ok()
}

/// First character of a single-letter flag field.
pub fn parse_char(field: &str) -> Option<char> {
    field.trim().chars().next()
}

/// Angle in degrees restricted to [0, 360).
pub fn parse_bearing(field: &str) -> Option<f64> {
    parse_f64(field).filter(|v| (0.0..360.0).contains(v))
}

/// Latitude from `ddmm.mmmm` plus `N`/`S` hemisphere, in signed decimal degrees.
pub fn parse_latitude(value: &str, hemisphere: &str) -> Option<f64> {
    let sign = match parse_char(hemisphere)? {
        'N' => 1.0,
        'S' => -1.0,
        _ => return None,
    };
    let degrees = degrees_minutes(value)?;
    if degrees > 90.0 {
        return None;
    }
    Some(sign * degrees)
}

/// Longitude from `dddmm.mmmm` plus `E`/`W` hemisphere, in signed decimal degrees.
pub fn parse_longitude(value: &str, hemisphere: &str) -> Option<f64> {
    let sign = match parse_char(hemisphere)? {
        'E' => 1.0,
        'W' => -1.0,
        _ => return None,
    };
    let degrees = degrees_minutes(value)?;
    if degrees > 180.0 {
        return None;
    }
    Some(sign * degrees)
}

/// Speed converted to knots according to an `N`/`M`/`K` unit flag.
pub fn speed_to_knots(speed: f64, unit: char) -> Option<f64> {
    match unit {
        'N' => Some(speed),
        'M' => Some(speed * KNOTS_PER_MPS),
        'K' => Some(speed * KNOTS_PER_KMH),
        _ => None,
    }
}

fn degrees_minutes(value: &str) -> Option<f64> {
    let raw = parse_f64(value)?;
    if raw < 0.0 {
        return None;
    }
    let degrees = (raw / 100.0).floor();
    let minutes = raw - degrees * 100.0;
    if minutes >= 60.0 {
        return None;
    }
    Some(degrees + minutes / 60.0)
}
