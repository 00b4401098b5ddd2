//! Test fixtures for night-route.
//!
//! Provides:
//! - Real Cambridge locations and route templates
//! - Clock helpers for business dates
//! - Scripted routing and briefing providers

#![allow(dead_code)]

pub mod cambridge_locations;
pub mod providers;

pub use cambridge_locations::*;
pub use providers::*;

use chrono::{NaiveDate, NaiveDateTime};
use night_route::stops::Stop;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn at(date: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
    date.and_hms_opt(hour, minute, 0).expect("valid time")
}

/// Monday 2024-03-04 21:00, a town night.
pub fn town_night() -> NaiveDateTime {
    at(date(2024, 3, 4), 21, 0)
}

/// Tuesday 2024-03-05 21:00, a village night.
pub fn village_night() -> NaiveDateTime {
    at(date(2024, 3, 5), 21, 0)
}

/// Stops along the equator spaced `step_deg` of longitude apart.
pub fn equator_stops(n: usize, step_deg: f64) -> Vec<Stop> {
    (0..n)
        .map(|i| Stop {
            address: format!("Stop {i}"),
            lat: 0.0,
            lng: i as f64 * step_deg,
            original_index: i,
        })
        .collect()
}
