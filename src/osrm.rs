//! OSRM HTTP adapter for route geometry and leg durations.

use serde::Deserialize;
use tracing::debug;

use crate::error::RoutingError;
use crate::haversine::Coordinate;
use crate::polyline::Polyline;
use crate::traits::{RouteGeometry, RouteProvider};

#[derive(Debug, Clone)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://router.project-osrm.org".to_string(),
            profile: "driving".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn route_url(&self, waypoints: &[Coordinate]) -> String {
        let coords = waypoints
            .iter()
            .map(|point| format!("{:.6},{:.6}", point.lng, point.lat))
            .collect::<Vec<_>>()
            .join(";");

        format!(
            "{}/route/v1/{}/{}?overview=full&geometries=geojson",
            self.config.base_url, self.config.profile, coords
        )
    }
}

impl RouteProvider for OsrmClient {
    fn route(&self, waypoints: &[Coordinate]) -> Result<RouteGeometry, RoutingError> {
        if waypoints.len() < 2 {
            return Err(RoutingError::TooFewWaypoints(waypoints.len()));
        }

        let url = self.route_url(waypoints);
        debug!(waypoints = waypoints.len(), "requesting OSRM route");
        let body = self
            .client
            .get(url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<OsrmRouteResponse>())?;

        into_geometry(body)
    }
}

fn into_geometry(body: OsrmRouteResponse) -> Result<RouteGeometry, RoutingError> {
    let code = body.code.unwrap_or_default();
    let route = body
        .routes
        .unwrap_or_default()
        .into_iter()
        .next()
        .ok_or(RoutingError::NoRoute(code))?;

    Ok(RouteGeometry {
        polyline: Polyline::from_lng_lat(&route.geometry.coordinates),
        duration_secs: route.duration,
        leg_durations_secs: route.legs.into_iter().map(|leg| leg.duration).collect(),
    })
}

#[derive(Debug, Deserialize)]
struct OsrmRouteResponse {
    code: Option<String>,
    routes: Option<Vec<OsrmRoute>>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    duration: f64,
    geometry: OsrmGeometry,
    #[serde(default)]
    legs: Vec<OsrmLeg>,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct OsrmLeg {
    duration: f64,
}
