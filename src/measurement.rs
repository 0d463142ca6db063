use serde::Serialize;
use std::time::{Duration, Instant};

/// Latest value of one telemetry quantity.
///
/// Overwritten in place on every update. Freshness is evaluated by the
/// reader against its own clock, never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub value: f64,
    pub unit: &'static str,
    pub updated_at: Option<Instant>,
    pub valid: bool,
}

/// Serialized form: `{value, unit, age_seconds}`, with nulls when stale or invalid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeasurementView {
    pub value: Option<f64>,
    pub unit: &'static str,
    pub age_seconds: Option<f64>,
}

impl Measurement {
    pub const fn new(unit: &'static str) -> Self {
        Self {
            value: 0.0,
            unit,
            updated_at: None,
            valid: false,
        }
    }

    pub fn set(&mut self, value: f64, at: Instant) {
        self.value = value;
        self.updated_at = Some(at);
        self.valid = true;
    }

    pub fn age(&self, now: Instant) -> Option<Duration> {
        self.updated_at.map(|t| now.saturating_duration_since(t))
    }

    /// Valid and updated no longer than `timeout` before `now`.
    pub fn is_fresh(&self, now: Instant, timeout: Duration) -> bool {
        self.valid && self.age(now).is_some_and(|age| age <= timeout)
    }

    pub fn fresh_value(&self, now: Instant, timeout: Duration) -> Option<f64> {
        self.is_fresh(now, timeout).then_some(self.value)
    }

    pub fn view(&self, now: Instant, timeout: Duration) -> MeasurementView {
        if self.is_fresh(now, timeout) {
            MeasurementView {
                value: Some(self.value),
                unit: self.unit,
                age_seconds: self.age(now).map(|age| age.as_secs_f64()),
            }
        } else {
            MeasurementView {
                value: None,
                unit: self.unit,
                age_seconds: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(10);

    #[test]
    fn test_new_measurement_is_null() {
        let m = Measurement::new("kn");
        let view = m.view(Instant::now(), TIMEOUT);
        assert_eq!(view.value, None);
        assert_eq!(view.age_seconds, None);
        assert_eq!(view.unit, "kn");
    }

    #[test]
    fn test_staleness_boundary() {
        let t = Instant::now();
        let mut m = Measurement::new("m");
        m.set(12.5, t);

        assert!(m.is_fresh(t + TIMEOUT - Duration::from_secs(1), TIMEOUT));
        assert_eq!(m.fresh_value(t + TIMEOUT - Duration::from_secs(1), TIMEOUT), Some(12.5));

        let view = m.view(t + TIMEOUT + Duration::from_secs(1), TIMEOUT);
        assert_eq!(view.value, None);
        assert_eq!(view.age_seconds, None);
        // The flag itself persists until overwritten
        assert!(m.valid);
    }

    #[test]
    fn test_view_reports_age() {
        let t = Instant::now();
        let mut m = Measurement::new("deg");
        m.set(270.0, t);
        let view = m.view(t + Duration::from_millis(2500), TIMEOUT);
        assert_eq!(view.value, Some(270.0));
        assert_eq!(view.age_seconds, Some(2.5));
    }

    #[test]
    fn test_invalid_is_never_reported() {
        let t = Instant::now();
        let mut m = Measurement::new("C");
        m.set(18.0, t);
        m.valid = false;
        assert_eq!(m.view(t, TIMEOUT).value, None);
    }

    #[test]
    fn test_serialization_shape() {
        let t = Instant::now();
        let mut m = Measurement::new("kn");
        m.set(5.0, t);
        let json = serde_json::to_value(m.view(t, TIMEOUT)).unwrap();
        assert_eq!(json["value"], 5.0);
        assert_eq!(json["unit"], "kn");
        assert_eq!(json["age_seconds"], 0.0);

        let stale = serde_json::to_value(m.view(t + Duration::from_secs(11), TIMEOUT)).unwrap();
        assert!(stale["value"].is_null());
        assert!(stale["age_seconds"].is_null());
    }
}
