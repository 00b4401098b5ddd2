//! night-route core
//!
//! Route progress, road closures and shift persistence for a night
//! delivery driver's navigator.

pub mod traits;
pub mod error;
pub mod config;
pub mod clock;
pub mod haversine;
pub mod polyline;
pub mod stops;
pub mod closures;
pub mod progress;
pub mod optimizer;
pub mod view;
pub mod eta;
pub mod osrm;
pub mod gemini;
pub mod briefing;
pub mod persistence;
pub mod admin;
pub mod session;
