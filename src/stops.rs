//! Delivery stops, the ordered stop list, and daily route templates.
//!
//! The position of a stop in [`StopList`] is the planned visiting order.
//! `original_index` is assigned once when the stop is created and is what
//! the route optimizer sorts by to restore the natural order.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::NavError;
use crate::haversine::Coordinate;

/// A single delivery location.
///
/// Serialized with the field names of the saved-session format
/// (`addr`, `lat`, `lng`, `originalIndex`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    #[serde(rename = "addr")]
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(rename = "originalIndex")]
    pub original_index: usize,
}

impl Stop {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

/// A stop as it appears in a static route template, before it gets a rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateStop {
    pub addr: String,
    pub lat: f64,
    pub lng: f64,
}

/// Which static template seeds the night's stop list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RouteType {
    Town,
    Village,
}

impl RouteType {
    /// Village runs go out on Sunday, Tuesday and Thursday nights.
    pub fn for_business_date(date: NaiveDate) -> Self {
        match date.weekday() {
            Weekday::Sun | Weekday::Tue | Weekday::Thu => RouteType::Village,
            _ => RouteType::Town,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteType::Town => "TOWN",
            RouteType::Village => "VILLAGE",
        }
    }
}

impl fmt::Display for RouteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouteType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TOWN" => Ok(RouteType::Town),
            "VILLAGE" => Ok(RouteType::Village),
            other => Err(format!("unknown route type: {other}")),
        }
    }
}

/// The calendar date a night shift belongs to.
///
/// Before `rollover_hour` local time the shift still belongs to the
/// previous day.
pub fn business_date(now: NaiveDateTime, rollover_hour: u32) -> NaiveDate {
    let date = now.date();
    if now.hour() < rollover_hour {
        date.pred_opt().unwrap_or(date)
    } else {
        date
    }
}

/// The two static daily templates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteTemplates {
    pub town: Vec<TemplateStop>,
    pub village: Vec<TemplateStop>,
}

impl RouteTemplates {
    /// Parse `{"town": [...], "village": [...]}`.
    pub fn from_json(json: &str) -> Result<Self, NavError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn for_route(&self, route_type: RouteType) -> &[TemplateStop] {
        match route_type {
            RouteType::Town => &self.town,
            RouteType::Village => &self.village,
        }
    }
}

/// Ordered, mutable sequence of stops.
///
/// Stops are never deleted. Every mutation keeps the `original_index` of
/// existing stops; only brand-new stops receive one, equal to the list
/// length at insertion time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StopList {
    stops: Vec<Stop>,
}

impl StopList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a fresh list from a template, ranking stops by template position.
    pub fn from_template(template: &[TemplateStop]) -> Self {
        let stops = template
            .iter()
            .enumerate()
            .map(|(i, stop)| Stop {
                address: stop.addr.clone(),
                lat: stop.lat,
                lng: stop.lng,
                original_index: i,
            })
            .collect();
        Self { stops }
    }

    /// Wrap stops restored from storage as-is.
    pub fn from_stops(stops: Vec<Stop>) -> Self {
        Self { stops }
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Stop> {
        self.stops.get(position)
    }

    pub fn as_slice(&self) -> &[Stop] {
        &self.stops
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Stop> {
        self.stops.iter()
    }

    /// Stops in `from..to`, clamped to the list bounds.
    pub fn slice(&self, from: usize, to: usize) -> &[Stop] {
        let to = to.min(self.stops.len());
        let from = from.min(to);
        &self.stops[from..to]
    }

    fn new_stop(&self, address: String, at: Coordinate) -> Stop {
        Stop {
            address,
            lat: at.lat,
            lng: at.lng,
            original_index: self.stops.len(),
        }
    }

    /// Add a new stop at the end of the route.
    pub fn append(&mut self, address: impl Into<String>, at: Coordinate) -> &Stop {
        let stop = self.new_stop(address.into(), at);
        debug!(address = %stop.address, original_index = stop.original_index, "appending stop");
        self.stops.push(stop);
        &self.stops[self.stops.len() - 1]
    }

    /// Add a new stop right after `position`, so it is visited next.
    ///
    /// A `position` at or past the end appends.
    pub fn insert_after(&mut self, position: usize, address: impl Into<String>, at: Coordinate) -> &Stop {
        let stop = self.new_stop(address.into(), at);
        let slot = position.saturating_add(1).min(self.stops.len());
        debug!(address = %stop.address, slot, "inserting stop");
        self.stops.insert(slot, stop);
        &self.stops[slot]
    }

    /// Rearrange the list so that position `i` holds the stop previously at `order[i]`.
    ///
    /// `order` must be a permutation of `0..len`.
    pub fn reorder(&mut self, order: &[usize]) -> Result<(), NavError> {
        let len = self.stops.len();
        let mut seen = vec![false; len];
        if order.len() != len {
            return Err(NavError::InvalidOrder { expected: len });
        }
        for &i in order {
            if i >= len || seen[i] {
                return Err(NavError::InvalidOrder { expected: len });
            }
            seen[i] = true;
        }

        let reordered = order.iter().map(|&i| self.stops[i].clone()).collect();
        self.stops = reordered;
        Ok(())
    }
}

impl<'a> IntoIterator for &'a StopList {
    type Item = &'a Stop;
    type IntoIter = std::slice::Iter<'a, Stop>;

    fn into_iter(self) -> Self::IntoIter {
        self.stops.iter()
    }
}
