//! Error types for the navigator and its collaborators.
//!
//! None of these reach the route-progress state machine: the session
//! catches them at the collaborator boundary and degrades locally.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("at least two waypoints are required, got {0}")]
    TooFewWaypoints(usize),
    #[error("routing service returned no route (code: {0})")]
    NoRoute(String),
}

#[derive(Debug, Error)]
pub enum BriefingError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("briefing service returned no text")]
    EmptyResponse,
    #[error("missing API key")]
    MissingApiKey,
}

#[derive(Debug, Error)]
pub enum NavError {
    #[error("stop order must be a permutation of 0..{expected}")]
    InvalidOrder { expected: usize },
    #[error("invalid route templates: {0}")]
    Templates(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}
