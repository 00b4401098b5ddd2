//! Polyline representation for route geometries.
//!
//! Routing services hand back GeoJSON `[lng, lat]` pairs; they are turned
//! into [`Coordinate`]s once, at the boundary, so the rest of the crate
//! never has to think about axis order.

use serde::{Deserialize, Serialize};

use crate::haversine::Coordinate;

/// A route geometry as an ordered list of decoded vertices.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<Coordinate>,
}

impl Polyline {
    pub fn new(points: Vec<Coordinate>) -> Self {
        Self { points }
    }

    /// Build a polyline from GeoJSON-ordered `[lng, lat]` pairs.
    pub fn from_lng_lat(pairs: &[[f64; 2]]) -> Self {
        Self {
            points: pairs
                .iter()
                .map(|[lng, lat]| Coordinate::new(*lat, *lng))
                .collect(),
        }
    }

    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    pub fn into_points(self) -> Vec<Coordinate> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
