//! Derived dashboard state.
//!
//! Recomputed from scratch on every position fix or tick. Nothing here is
//! cached between calls.

use crate::closures::{RoadClosure, impacts_path};
use crate::config::NavConfig;
use crate::haversine::Coordinate;
use crate::polyline::Polyline;
use crate::progress::find_trigger_stop;
use crate::stops::Stop;

/// How many stops after the current one the dashboard previews.
pub const QUEUE_PREVIEW_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct DerivedView {
    pub current_stop: Option<Stop>,
    /// Up to [`QUEUE_PREVIEW_LEN`] stops after the current one.
    pub upcoming: Vec<Stop>,
    pub drops_left: usize,
    /// First stop at or after the index within trigger distance.
    pub nearby_stop: Option<usize>,
    /// Whether the routed path passes an active closure.
    pub path_impacted: bool,
    pub complete: bool,
}

/// Everything the dashboard shows that follows directly from the route
/// state. `active` must already be filtered to closures active today.
pub fn derive_view(
    stops: &[Stop],
    index: usize,
    last_position: Option<Coordinate>,
    active: &[&RoadClosure],
    path: Option<&Polyline>,
    config: &NavConfig,
) -> DerivedView {
    let index = index.min(stops.len());
    let preview_end = (index + 1 + QUEUE_PREVIEW_LEN).min(stops.len());

    DerivedView {
        current_stop: stops.get(index).cloned(),
        upcoming: stops
            .get(index + 1..preview_end)
            .map(<[Stop]>::to_vec)
            .unwrap_or_default(),
        drops_left: stops.len() - index,
        nearby_stop: last_position.and_then(|position| {
            find_trigger_stop(stops, index, &position, config.trigger_distance_m)
        }),
        path_impacted: path.is_some_and(|path| impacts_path(path, active, config.path_impact)),
        complete: index == stops.len(),
    }
}
