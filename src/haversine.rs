//! Haversine distance and straight-line travel estimates.
//!
//! Every proximity check in the crate (arrival trigger, closure impact,
//! ETA fallback) goes through [`distance`]. Invalid input is not rejected:
//! NaN coordinates produce a NaN distance, which compares false against
//! every threshold, so a bad GPS sample simply never triggers anything.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Great-circle distance to `other` in meters.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        distance(self.lat, self.lng, other.lat, other.lng)
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self { lat, lng }
    }
}

impl From<Coordinate> for (f64, f64) {
    fn from(value: Coordinate) -> Self {
        (value.lat, value.lng)
    }
}

/// Great-circle distance between two points in meters.
pub fn distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    // Rounding can push `a` just past 1 for antipodal points. A plain
    // comparison keeps NaN flowing through.
    let a = if a > 1.0 { 1.0 } else { a };
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_M * c
}

/// Straight-line travel estimator.
///
/// Ignores the road network entirely; used to keep an ETA on screen when
/// the routing service fails.
#[derive(Debug, Clone)]
pub struct StraightLineEstimator {
    /// Assumed average driving speed in meters per second.
    pub speed_mps: f64,
}

impl StraightLineEstimator {
    pub fn new(speed_mps: f64) -> Self {
        Self { speed_mps }
    }

    /// Length of the path `from -> waypoints[0] -> waypoints[1] -> ...` in meters.
    pub fn path_length_m(&self, from: Coordinate, waypoints: &[Coordinate]) -> f64 {
        let mut total = 0.0;
        let mut prev = from;
        for point in waypoints {
            total += prev.distance_to(point);
            prev = *point;
        }
        total
    }

    /// Convert a distance in meters to travel time in seconds.
    pub fn meters_to_seconds(&self, meters: f64) -> f64 {
        meters / self.speed_mps
    }
}
