//! Road closures: time-bounded circular exclusion zones.
//!
//! Activity is tested against a caller-supplied calendar date, never a
//! global clock. Proximity is tested per point (used by the optimizer for
//! stops) and per polyline (used to warn that the routed path is blocked).

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::haversine::Coordinate;
use crate::polyline::Polyline;

/// Radius recorded for closures placed by hand on the map.
pub const MANUAL_CLOSURE_RADIUS_M: f64 = 100.0;

/// Radius recorded for closures detected by the briefing service.
pub const DETECTED_CLOSURE_RADIUS_M: f64 = 150.0;

/// Note prefix marking a closure as machine-detected.
pub const DETECTED_NOTE_PREFIX: &str = "AUTO: ";

const DETECTED_ID_PREFIX: &str = "auto-";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// An immutable, time-bounded exclusion zone.
///
/// Dates are ISO `YYYY-MM-DD` strings and the window is inclusive on both
/// ends. Serialized with the field names of the saved-session format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadClosure {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    /// Meters. Only consulted under [`ImpactPolicy::ClosureRadius`].
    pub radius: f64,
    pub start_date: String,
    pub end_date: String,
    pub note: String,
}

impl RoadClosure {
    /// A closure placed by hand, active from `start` to `end` inclusive.
    pub fn manual(at: Coordinate, start: NaiveDate, end: NaiveDate, note: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            lat: at.lat,
            lng: at.lng,
            radius: MANUAL_CLOSURE_RADIUS_M,
            start_date: start.format(DATE_FORMAT).to_string(),
            end_date: end.format(DATE_FORMAT).to_string(),
            note: note.into(),
        }
    }

    /// A closure reported by the briefing service, active for `today` only.
    pub fn detected(at: Coordinate, today: NaiveDate, note: &str) -> Self {
        let day = today.format(DATE_FORMAT).to_string();
        Self {
            id: format!("{DETECTED_ID_PREFIX}{}", Uuid::new_v4().simple()),
            lat: at.lat,
            lng: at.lng,
            radius: DETECTED_CLOSURE_RADIUS_M,
            start_date: day.clone(),
            end_date: day,
            note: format!("{DETECTED_NOTE_PREFIX}{note}"),
        }
    }

    pub fn center(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }

    pub fn is_detected(&self) -> bool {
        self.id.starts_with(DETECTED_ID_PREFIX)
    }

    /// Whether `today` falls inside the inclusive date window.
    ///
    /// A closure with unparsable dates is never active.
    pub fn is_active(&self, today: NaiveDate) -> bool {
        let start = NaiveDate::parse_from_str(&self.start_date, DATE_FORMAT);
        let end = NaiveDate::parse_from_str(&self.end_date, DATE_FORMAT);
        match (start, end) {
            (Ok(start), Ok(end)) => start <= today && today <= end,
            _ => {
                debug!(id = %self.id, "closure has unparsable dates, treating as inactive");
                false
            }
        }
    }
}

/// How close a point must be to a closure center to count as impacted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImpactPolicy {
    /// One threshold in meters for every closure.
    FixedThreshold(f64),
    /// Each closure's own `radius`.
    ClosureRadius,
}

impl ImpactPolicy {
    pub fn reaches(&self, closure: &RoadClosure, point: &Coordinate) -> bool {
        let limit = match self {
            ImpactPolicy::FixedThreshold(meters) => *meters,
            ImpactPolicy::ClosureRadius => closure.radius,
        };
        closure.center().distance_to(point) < limit
    }
}

/// Whether `point` lies within reach of any of the given closures.
///
/// Callers pass only the closures active today.
pub fn impacts_point(point: &Coordinate, active: &[&RoadClosure], policy: ImpactPolicy) -> bool {
    active.iter().any(|closure| policy.reaches(closure, point))
}

/// Whether any vertex of `path` lies within reach of any of the given closures.
///
/// Only vertices are sampled, not the segments between them: a sparse
/// polyline can pass straight through a closure that sits between two
/// vertices without being flagged. Routing geometries requested with full
/// overview are dense enough for this to be rare.
pub fn impacts_path(path: &Polyline, active: &[&RoadClosure], policy: ImpactPolicy) -> bool {
    if active.is_empty() || path.is_empty() {
        return false;
    }
    path.points()
        .par_iter()
        .any(|point| impacts_point(point, active, policy))
}

/// The set of known closures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClosureRegistry {
    closures: Vec<RoadClosure>,
}

impl ClosureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_closures(closures: Vec<RoadClosure>) -> Self {
        Self { closures }
    }

    pub fn len(&self) -> usize {
        self.closures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closures.is_empty()
    }

    pub fn all(&self) -> &[RoadClosure] {
        &self.closures
    }

    pub fn get(&self, id: &str) -> Option<&RoadClosure> {
        self.closures.iter().find(|c| c.id == id)
    }

    /// Closures whose date window contains `today`.
    pub fn active(&self, today: NaiveDate) -> Vec<&RoadClosure> {
        self.closures.iter().filter(|c| c.is_active(today)).collect()
    }

    /// Add a closure. A closure with the same id replaces the old one.
    pub fn register(&mut self, closure: RoadClosure) {
        if let Some(existing) = self.closures.iter_mut().find(|c| c.id == closure.id) {
            warn!(id = %closure.id, "closure id already registered, replacing");
            *existing = closure;
            return;
        }
        info!(id = %closure.id, lat = closure.lat, lng = closure.lng, note = %closure.note, "closure registered");
        self.closures.push(closure);
    }

    pub fn remove(&mut self, id: &str) -> Option<RoadClosure> {
        let position = self.closures.iter().position(|c| c.id == id)?;
        info!(id, "closure removed");
        Some(self.closures.remove(position))
    }

    /// Add freshly detected closures, dropping any existing closure whose
    /// center is within `tolerance_deg` (on both axes) of a new one.
    pub fn merge_detected(&mut self, detected: Vec<RoadClosure>, tolerance_deg: f64) {
        if detected.is_empty() {
            return;
        }
        let before = self.closures.len();
        self.closures.retain(|existing| {
            !detected.iter().any(|new| {
                (new.lat - existing.lat).abs() < tolerance_deg
                    && (new.lng - existing.lng).abs() < tolerance_deg
            })
        });
        info!(
            replaced = before - self.closures.len(),
            added = detected.len(),
            "merging detected closures"
        );
        self.closures.extend(detected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_manual_closure_dates_are_iso() {
        let closure = RoadClosure::manual(Coordinate::new(52.2, 0.13), day(4), day(6), "Burst main");
        assert_eq!(closure.start_date, "2024-03-04");
        assert_eq!(closure.end_date, "2024-03-06");
        assert_eq!(closure.radius, MANUAL_CLOSURE_RADIUS_M);
        assert!(!closure.is_detected());
    }

    #[test]
    fn test_detected_closure_is_tagged() {
        let closure = RoadClosure::detected(Coordinate::new(52.2, 0.13), day(4), "Gas works");
        assert!(closure.is_detected());
        assert_eq!(closure.note, "AUTO: Gas works");
        assert!(closure.is_active(day(4)));
        assert!(!closure.is_active(day(5)));
    }

    #[test]
    fn test_unparsable_dates_are_inactive() {
        let mut closure = RoadClosure::manual(Coordinate::new(52.2, 0.13), day(4), day(6), "");
        closure.end_date = "soon".to_string();
        assert!(!closure.is_active(day(5)));
    }

    #[test]
    fn test_ids_are_unique() {
        let a = RoadClosure::manual(Coordinate::new(0.0, 0.0), day(1), day(1), "");
        let b = RoadClosure::manual(Coordinate::new(0.0, 0.0), day(1), day(1), "");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_serializes_camel_case() {
        let closure = RoadClosure::manual(Coordinate::new(52.2, 0.13), day(4), day(4), "x");
        let json = serde_json::to_value(&closure).unwrap();
        assert!(json.get("startDate").is_some());
        assert!(json.get("endDate").is_some());
    }
}
