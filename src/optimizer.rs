//! Closure-aware re-sequencing of the unvisited tail.
//!
//! This is a deprioritization heuristic, not a routing solver: the tail is
//! split into stops clear of every active closure and stops near one, each
//! group is put back into its natural (`original_index`) order, and the
//! blocked group goes last. The visited prefix and the index are never
//! touched.
//!
//! With no active closures the whole tail simply returns to natural order,
//! undoing any earlier deprioritization.

use tracing::info;

use crate::closures::{ImpactPolicy, RoadClosure, impacts_point};
use crate::error::NavError;
use crate::progress::ProgressEvent;
use crate::stops::{Stop, StopList};

/// Result of applying the optimizer to a stop list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizationOutcome {
    /// Index the partition was computed against.
    pub index: usize,
    pub clear: usize,
    pub blocked: usize,
    /// Whether the stop order actually changed.
    pub changed: bool,
    /// What happened to a running dwell when the new order was applied.
    /// `DwellStarted` carries the token the caller must tick from now on.
    pub dwell_event: Option<ProgressEvent>,
}

/// Snapshot taken when an optimization starts.
///
/// Applying a ticket later re-runs the partition against the index current
/// at that moment, so stops completed while the optimization was in flight
/// stay in the visited prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationTicket {
    pub started_at_index: usize,
    pub closures: Vec<RoadClosure>,
}

#[derive(Debug, Clone)]
pub struct RouteOptimizer {
    policy: ImpactPolicy,
}

impl RouteOptimizer {
    pub fn new(policy: ImpactPolicy) -> Self {
        Self { policy }
    }

    /// Positions of `stops` in their new order: `done ++ clear ++ blocked`.
    ///
    /// `active` must already be filtered to closures active today.
    pub fn plan(&self, stops: &[Stop], index: usize, active: &[&RoadClosure]) -> Vec<usize> {
        let index = index.min(stops.len());
        let mut clear = Vec::new();
        let mut blocked = Vec::new();

        for (position, stop) in stops.iter().enumerate().skip(index) {
            if impacts_point(&stop.coordinate(), active, self.policy) {
                blocked.push(position);
            } else {
                clear.push(position);
            }
        }
        clear.sort_by_key(|&position| stops[position].original_index);
        blocked.sort_by_key(|&position| stops[position].original_index);

        (0..index).chain(clear).chain(blocked).collect()
    }

    /// Re-sequence the tail of `list` in place.
    pub fn apply(
        &self,
        list: &mut StopList,
        index: usize,
        active: &[&RoadClosure],
    ) -> Result<OptimizationOutcome, NavError> {
        let index = index.min(list.len());
        let order = self.plan(list.as_slice(), index, active);
        let blocked = list
            .slice(index, list.len())
            .iter()
            .filter(|stop| impacts_point(&stop.coordinate(), active, self.policy))
            .count();
        let changed = order.iter().enumerate().any(|(i, &position)| i != position);

        list.reorder(&order)?;
        let outcome = OptimizationOutcome {
            index,
            clear: list.len() - index - blocked,
            blocked,
            changed,
            dwell_event: None,
        };
        info!(
            index,
            clear = outcome.clear,
            blocked = outcome.blocked,
            changed,
            "route tail re-sequenced"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::haversine::Coordinate;
    use chrono::NaiveDate;

    fn stop(original_index: usize, lng: f64) -> Stop {
        Stop {
            address: format!("Stop {original_index}"),
            lat: 0.0,
            lng,
            original_index,
        }
    }

    #[test]
    fn test_plan_with_no_closures_restores_natural_order() {
        let stops = vec![stop(0, 0.0), stop(3, 0.03), stop(1, 0.01), stop(2, 0.02)];
        let optimizer = RouteOptimizer::new(ImpactPolicy::FixedThreshold(200.0));
        assert_eq!(optimizer.plan(&stops, 1, &[]), vec![0, 2, 3, 1]);
    }

    #[test]
    fn test_plan_past_end_is_identity() {
        let stops = vec![stop(0, 0.0), stop(1, 0.01)];
        let optimizer = RouteOptimizer::new(ImpactPolicy::FixedThreshold(200.0));
        assert_eq!(optimizer.plan(&stops, 5, &[]), vec![0, 1]);
    }

    #[test]
    fn test_blocked_stop_moves_last() {
        let stops = vec![stop(0, 0.0), stop(1, 0.01), stop(2, 0.02)];
        let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let closure = RoadClosure::manual(Coordinate::new(0.0, 0.01), day, day, "");
        let optimizer = RouteOptimizer::new(ImpactPolicy::FixedThreshold(200.0));
        assert_eq!(optimizer.plan(&stops, 0, &[&closure]), vec![0, 2, 1]);
    }
}
