//! Finish and next-arrival estimates.
//!
//! The routing service is tried first; on any failure the estimate falls
//! back to straight-line distance at an assumed average speed so the
//! dashboard always has a finish time to show.

use std::time::Duration;

use tracing::warn;

use crate::config::NavConfig;
use crate::haversine::{Coordinate, StraightLineEstimator};
use crate::polyline::Polyline;
use crate::stops::Stop;
use crate::traits::RouteProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EtaSource {
    Routed,
    StraightLine,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EtaEstimate {
    /// Time until the last remaining stop is serviced.
    pub finish_in: Duration,
    /// Time until the next stop is serviced. Only known when routed.
    pub next_in: Option<Duration>,
    pub source: EtaSource,
    /// Road geometry of the remaining route, when routed.
    pub geometry: Option<Polyline>,
}

fn seconds(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
}

/// Estimate the rest of the shift starting from `from`.
///
/// Returns `None` when nothing remains.
pub fn estimate_eta<P: RouteProvider + ?Sized>(
    provider: &P,
    from: Coordinate,
    remaining: &[Stop],
    config: &NavConfig,
) -> Option<EtaEstimate> {
    if remaining.is_empty() {
        return None;
    }

    let service = config.service_time_per_stop.as_secs_f64();
    let waypoints: Vec<Coordinate> = std::iter::once(from)
        .chain(remaining.iter().map(Stop::coordinate))
        .collect();

    match provider.route(&waypoints) {
        Ok(route) => {
            let drive = route.duration_secs * config.eta_multiplier;
            let first_leg = route.leg_durations_secs.first().copied().unwrap_or(0.0);
            Some(EtaEstimate {
                finish_in: seconds(drive + remaining.len() as f64 * service),
                next_in: Some(seconds(first_leg * config.eta_multiplier + service)),
                source: EtaSource::Routed,
                geometry: Some(route.polyline),
            })
        }
        Err(err) => {
            warn!(error = %err, "routing failed, falling back to straight-line ETA");
            Some(straight_line_eta(from, &waypoints[1..], config))
        }
    }
}

fn straight_line_eta(from: Coordinate, waypoints: &[Coordinate], config: &NavConfig) -> EtaEstimate {
    let estimator = StraightLineEstimator::new(config.fallback_speed_mps);
    let meters = estimator.path_length_m(from, waypoints);
    let drive = estimator.meters_to_seconds(meters) * config.eta_multiplier;
    let service = waypoints.len() as f64 * config.service_time_per_stop.as_secs_f64();

    EtaEstimate {
        finish_in: seconds(drive + service),
        next_in: None,
        source: EtaSource::StraightLine,
        geometry: None,
    }
}
