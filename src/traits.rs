//! Collaborator seams for the navigator.
//!
//! The session only talks to the outside world through these traits, so
//! the clock, storage, routing and briefing services can all be replaced
//! by deterministic fakes.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{BriefingError, RoutingError, StoreError};
use crate::haversine::Coordinate;
use crate::polyline::Polyline;

/// Local wall-clock time.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// String-keyed durable storage (the persistence gateway).
///
/// Values are opaque strings; callers store JSON where they need structure.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;

    /// Write several keys as one unit. Stores that can commit a batch
    /// atomically should override this; the default sets each key in turn.
    fn set_many(&mut self, entries: &[(&str, &str)]) -> Result<(), StoreError> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }
}

/// Road geometry and timings for an ordered list of waypoints.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteGeometry {
    pub polyline: Polyline,
    /// Total driving duration in seconds.
    pub duration_secs: f64,
    /// Driving duration of each leg, one per consecutive waypoint pair.
    pub leg_durations_secs: Vec<f64>,
}

/// External routing/ETA service.
pub trait RouteProvider {
    /// Waypoints are visited in order; the first one is the driver's position.
    fn route(&self, waypoints: &[Coordinate]) -> Result<RouteGeometry, RoutingError>;
}

/// A web page the briefing report was grounded on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Report {
    pub text: String,
    pub sources: Vec<Source>,
}

/// External reasoning/search service used for road-closure briefings.
pub trait BriefingProvider {
    /// Free-text traffic report grounded on live search results.
    fn search_report(&self, prompt: &str) -> Result<Report, BriefingError>;

    /// Raw model output for a structured (JSON) extraction request.
    ///
    /// The output is untrusted: it may not be JSON at all.
    fn extract_json(&self, prompt: &str) -> Result<String, BriefingError>;
}
