use serde::Serialize;
use std::time::{Duration, Instant};

/// One vessel tracked from AIS reports, keyed by MMSI.
///
/// Distance, bearing, CPA and TCPA are relative to own ship at the time the
/// last report was ingested.
#[derive(Debug, Clone, PartialEq)]
pub struct AisTarget {
    pub mmsi: u32,
    pub name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub cog: Option<f64>,
    pub sog: Option<f64>,
    pub heading: Option<f64>,
    pub distance: Option<f64>, // nm
    pub bearing: Option<f64>,  // degrees true
    pub cpa: Option<f64>,      // nm
    pub tcpa: Option<f64>,     // minutes
    pub class_b: bool,
    pub updated_at: Instant,
}

impl AisTarget {
    pub fn new(mmsi: u32, updated_at: Instant) -> Self {
        Self {
            mmsi,
            name: None,
            latitude: None,
            longitude: None,
            cog: None,
            sog: None,
            heading: None,
            distance: None,
            bearing: None,
            cpa: None,
            tcpa: None,
            class_b: false,
            updated_at,
        }
    }

    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.updated_at)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Updated,
    Inserted,
    /// Table full and the MMSI is not tracked; nothing changed
    Dropped,
}

/// Fixed-capacity target table.
///
/// Upsert replaces by MMSI or appends while there is room; a new MMSI
/// arriving when the table is full is dropped (existing targets are never
/// evicted to make room).
#[derive(Debug, Clone)]
pub struct AisTargetTable {
    targets: Vec<AisTarget>,
    capacity: usize,
}

impl AisTargetTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            targets: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn upsert(&mut self, mut target: AisTarget) -> UpsertOutcome {
        if let Some(existing) = self.targets.iter_mut().find(|t| t.mmsi == target.mmsi) {
            if target.name.is_none() {
                target.name = existing.name.take();
            }
            *existing = target;
            return UpsertOutcome::Updated;
        }

        if self.targets.len() >= self.capacity {
            return UpsertOutcome::Dropped;
        }
        self.targets.push(target);
        UpsertOutcome::Inserted
    }

    /// Attach a name to an already tracked target; unknown MMSIs are ignored.
    pub fn update_name(&mut self, mmsi: u32, name: &str) -> bool {
        match self.targets.iter_mut().find(|t| t.mmsi == mmsi) {
            Some(target) => {
                target.name = (!name.is_empty()).then(|| name.to_string());
                true
            }
            None => false,
        }
    }

    /// Remove targets older than `max_age`, keeping survivors in order.
    pub fn purge_stale(&mut self, now: Instant, max_age: Duration) -> usize {
        let before = self.targets.len();
        self.targets.retain(|t| t.age(now) <= max_age);
        before - self.targets.len()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Serializable list of the targets not older than `timeout`.
    pub fn view(&self, now: Instant, timeout: Duration) -> Vec<AisTargetView> {
        self.targets
            .iter()
            .filter(|t| t.age(now) <= timeout)
            .map(|t| AisTargetView {
                mmsi: t.mmsi,
                name: t.name.clone(),
                lat: t.latitude,
                lon: t.longitude,
                cog: t.cog,
                sog: t.sog,
                heading: t.heading,
                distance: t.distance,
                bearing: t.bearing,
                cpa: t.cpa,
                tcpa: t.tcpa,
                class_b: t.class_b,
                age_seconds: t.age(now).as_secs_f64(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AisTargetView {
    pub mmsi: u32,
    pub name: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub cog: Option<f64>,
    pub sog: Option<f64>,
    pub heading: Option<f64>,
    pub distance: Option<f64>,
    pub bearing: Option<f64>,
    pub cpa: Option<f64>,
    pub tcpa: Option<f64>,
    pub class_b: bool,
    pub age_seconds: f64,
}
