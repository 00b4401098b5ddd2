//! Tunables for the navigator.

use std::time::Duration;

use crate::closures::ImpactPolicy;

#[derive(Debug, Clone)]
pub struct NavConfig {
    /// Distance in meters at which a stop starts the arrival dwell.
    pub trigger_distance_m: f64,
    /// How long the driver must stay within trigger distance before the
    /// stop auto-completes.
    pub dwell_duration: Duration,
    /// Interval at which the dwell timer is expected to be ticked.
    pub dwell_tick: Duration,
    /// Proximity rule used by the optimizer to mark stops as blocked.
    pub stop_impact: ImpactPolicy,
    /// Proximity rule used to flag the routed path as blocked.
    pub path_impact: ImpactPolicy,
    /// Hour of the day (local) before which the shift belongs to yesterday.
    pub rollover_hour: u32,
    /// Number of upcoming stops included in a briefing request.
    pub briefing_window: usize,
    /// Degrees within which a detected closure replaces an existing one.
    pub detection_merge_tolerance_deg: f64,
    /// Safety factor applied to every driving duration.
    pub eta_multiplier: f64,
    /// Time spent at each stop.
    pub service_time_per_stop: Duration,
    /// Average speed used for straight-line ETAs when routing fails.
    pub fallback_speed_mps: f64,
    /// Shared secret for the admin gate. Not a security boundary.
    pub admin_secret: String,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            trigger_distance_m: 40.0,
            dwell_duration: Duration::from_secs(5),
            dwell_tick: Duration::from_millis(100),
            stop_impact: ImpactPolicy::FixedThreshold(200.0),
            path_impact: ImpactPolicy::FixedThreshold(110.0),
            rollover_hour: 4,
            briefing_window: 15,
            detection_merge_tolerance_deg: 0.0001,
            eta_multiplier: 1.2,
            service_time_per_stop: Duration::from_secs(60),
            fallback_speed_mps: 7.0,
            admin_secret: "5371".to_string(),
        }
    }
}
