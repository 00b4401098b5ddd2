//! Real Cambridge / South Cambridgeshire delivery points.
//!
//! Coordinates taken from OpenStreetMap. Consecutive town stops are a few
//! hundred meters apart, well outside the default trigger distance.

use night_route::haversine::Coordinate;
use night_route::stops::{RouteTemplates, TemplateStop};

/// A named location with coordinates.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }

    pub fn template_stop(&self) -> TemplateStop {
        TemplateStop {
            addr: self.name.to_string(),
            lat: self.lat,
            lng: self.lng,
        }
    }
}

// ============================================================================
// Town round (Mon, Wed, Fri, Sat business dates)
// ============================================================================

pub const TOWN: &[Location] = &[
    Location::new("Regent Street", 52.2010, 0.1265),
    Location::new("Hills Road", 52.1935, 0.1361),
    Location::new("Station Road", 52.1960, 0.1350),
    Location::new("Mill Road", 52.1985, 0.1408),
    Location::new("Newmarket Road", 52.2100, 0.1440),
    Location::new("Chesterton Road", 52.2140, 0.1250),
    Location::new("Huntingdon Road", 52.2200, 0.1000),
];

// ============================================================================
// Village round (Sun, Tue, Thu business dates)
// ============================================================================

pub const VILLAGES: &[Location] = &[
    Location::new("Girton High Street", 52.2410, 0.0790),
    Location::new("Histon Station Road", 52.2520, 0.1050),
    Location::new("Impington Lane", 52.2500, 0.1120),
    Location::new("Cottenham High Street", 52.2860, 0.1260),
    Location::new("Milton High Street", 52.2430, 0.1650),
];

/// Somewhere on the ring road, far from every stop.
pub const DEPOT: Location = Location::new("Cambridge Depot", 52.2300, 0.1550);

pub fn templates() -> RouteTemplates {
    RouteTemplates {
        town: TOWN.iter().map(Location::template_stop).collect(),
        village: VILLAGES.iter().map(Location::template_stop).collect(),
    }
}
