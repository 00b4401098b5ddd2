//! Scripted collaborators.

use std::cell::RefCell;

use night_route::error::{BriefingError, RoutingError};
use night_route::haversine::Coordinate;
use night_route::polyline::Polyline;
use night_route::traits::{BriefingProvider, Report, RouteGeometry, RouteProvider, Source};

/// Routing service that answers with fixed per-leg durations, or fails.
#[derive(Debug, Default)]
pub struct FakeRouter {
    pub leg_secs: Option<f64>,
    pub calls: RefCell<Vec<Vec<Coordinate>>>,
}

impl FakeRouter {
    pub fn with_leg_secs(leg_secs: f64) -> Self {
        Self {
            leg_secs: Some(leg_secs),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }
}

impl RouteProvider for FakeRouter {
    fn route(&self, waypoints: &[Coordinate]) -> Result<RouteGeometry, RoutingError> {
        self.calls.borrow_mut().push(waypoints.to_vec());
        let leg_secs = self
            .leg_secs
            .ok_or_else(|| RoutingError::NoRoute("NoRoute".to_string()))?;
        let legs = vec![leg_secs; waypoints.len().saturating_sub(1)];
        Ok(RouteGeometry {
            polyline: Polyline::new(waypoints.to_vec()),
            duration_secs: legs.iter().sum(),
            leg_durations_secs: legs,
        })
    }
}

/// Briefing service with canned answers for each of its two calls.
#[derive(Debug)]
pub struct ScriptedBriefing {
    pub report: Result<Report, ()>,
    pub extraction: Result<String, ()>,
    pub prompts: RefCell<Vec<String>>,
}

impl ScriptedBriefing {
    pub fn new(report_text: &str, extraction: &str) -> Self {
        Self {
            report: Ok(Report {
                text: report_text.to_string(),
                sources: vec![Source {
                    title: "Cambridgeshire roadworks".to_string(),
                    uri: "https://www.cambridgeshire.gov.uk/roadworks".to_string(),
                }],
            }),
            extraction: Ok(extraction.to_string()),
            prompts: RefCell::new(Vec::new()),
        }
    }

    pub fn offline() -> Self {
        Self {
            report: Err(()),
            extraction: Err(()),
            prompts: RefCell::new(Vec::new()),
        }
    }

    pub fn report_fails(mut self) -> Self {
        self.report = Err(());
        self
    }

    pub fn extraction_fails(mut self) -> Self {
        self.extraction = Err(());
        self
    }
}

impl BriefingProvider for ScriptedBriefing {
    fn search_report(&self, prompt: &str) -> Result<Report, BriefingError> {
        self.prompts.borrow_mut().push(prompt.to_string());
        self.report.clone().map_err(|_| BriefingError::EmptyResponse)
    }

    fn extract_json(&self, prompt: &str) -> Result<String, BriefingError> {
        self.prompts.borrow_mut().push(prompt.to_string());
        self.extraction.clone().map_err(|_| BriefingError::EmptyResponse)
    }
}
