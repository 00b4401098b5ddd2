//! A driver's shift: the stop list, closures and route progress, mirrored
//! into a key-value store after every change.
//!
//! The session is the only place that talks to the collaborators. Failures
//! from storage, routing and the briefing service are logged and degraded
//! here; none of them reach the progress state machine.

use std::time::Duration;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::admin::AdminGate;
use crate::briefing::{self, Briefing};
use crate::closures::{ClosureRegistry, RoadClosure};
use crate::config::NavConfig;
use crate::error::NavError;
use crate::eta::{EtaEstimate, estimate_eta};
use crate::haversine::Coordinate;
use crate::optimizer::{OptimizationOutcome, OptimizationTicket, RouteOptimizer};
use crate::persistence;
use crate::progress::{DwellToken, PositionSample, ProgressEvent, ProgressState, RouteProgress};
use crate::stops::{RouteTemplates, RouteType, StopList, business_date};
use crate::traits::{BriefingProvider, Clock, KeyValueStore, RouteProvider};
use crate::view::{DerivedView, derive_view};

/// A closure being placed by hand, before it gets an id.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosureDraft {
    pub at: Coordinate,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub note: String,
}

impl ClosureDraft {
    /// A closure for a single day, the default the map form starts with.
    pub fn for_day(at: Coordinate, day: NaiveDate, note: impl Into<String>) -> Self {
        Self {
            at,
            start: day,
            end: day,
            note: note.into(),
        }
    }
}

/// Snapshot of everything the dashboard renders.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub route_type: RouteType,
    pub index: usize,
    pub derived: DerivedView,
    pub state: ProgressState,
    pub is_arrived: bool,
    /// Dwell completion in percent.
    pub arrival_progress: f64,
    pub active_arrival_index: Option<usize>,
    /// Token the dwell timer must tick with, while a dwell is running.
    pub dwell_token: Option<DwellToken>,
    /// The logical position, or the raw fix when there is none yet.
    pub display_position: Option<Coordinate>,
    pub gps_accuracy_m: Option<f64>,
    pub active_closures: usize,
    pub eta: Option<EtaEstimate>,
    pub is_admin: bool,
}

pub struct Session<S: KeyValueStore, C: Clock> {
    store: S,
    clock: C,
    config: NavConfig,
    gate: AdminGate,
    optimizer: RouteOptimizer,
    route_type: RouteType,
    stops: StopList,
    closures: ClosureRegistry,
    progress: RouteProgress,
    raw_position: Option<PositionSample>,
    /// Where the driver is considered to be for display and ETA purposes.
    /// Snaps to the last completed stop on every index change.
    logical_position: Option<Coordinate>,
    eta: Option<EtaEstimate>,
    briefing: Option<Briefing>,
    is_admin: bool,
}

impl<S: KeyValueStore, C: Clock> Session<S, C> {
    /// Resume the saved shift, or start tonight's route from its template.
    ///
    /// Saved stops are only resumed when they were saved for the same route
    /// type as tonight's. Anything unreadable counts as not saved.
    pub fn restore(mut store: S, clock: C, templates: &RouteTemplates, config: NavConfig) -> Self {
        let business = business_date(clock.now(), config.rollover_hour);
        let route_type = RouteType::for_business_date(business);
        let closures = persistence::load_closures(&store).unwrap_or_default();
        let is_admin = persistence::load_admin(&store);

        let saved_stops = match (
            persistence::load_stops(&store),
            persistence::load_route_type(&store),
        ) {
            (Some(stops), Some(saved_type)) if saved_type == route_type => Some(stops),
            (Some(_), saved_type) => {
                info!(?saved_type, %route_type, "saved stops belong to another route, reseeding");
                None
            }
            (None, _) => None,
        };

        let (stops, index) = match saved_stops {
            Some(stops) => {
                let saved_index = persistence::load_index(&store).unwrap_or(0);
                let index = saved_index.min(stops.len());
                if index != saved_index {
                    warn!(saved_index, stops = stops.len(), "saved index out of range, clamping");
                }
                info!(%route_type, index, stops = stops.len(), "resuming saved route");
                (stops, index)
            }
            None => {
                let stops = StopList::from_template(templates.for_route(route_type));
                info!(%route_type, %business, stops = stops.len(), "starting route from template");
                persistence::save_route_type(&mut store, route_type);
                persistence::save_progress(&mut store, 0, &stops, &closures);
                (stops, 0)
            }
        };

        Self {
            store,
            clock,
            gate: AdminGate::new(config.admin_secret.clone()),
            optimizer: RouteOptimizer::new(config.stop_impact),
            progress: RouteProgress::from_config(&config, index),
            config,
            route_type,
            stops,
            closures,
            raw_position: None,
            logical_position: None,
            eta: None,
            briefing: None,
            is_admin,
        }
    }

    pub fn route_type(&self) -> RouteType {
        self.route_type
    }

    pub fn index(&self) -> usize {
        self.progress.index()
    }

    pub fn stops(&self) -> &StopList {
        &self.stops
    }

    pub fn closures(&self) -> &ClosureRegistry {
        &self.closures
    }

    pub fn progress(&self) -> &RouteProgress {
        &self.progress
    }

    pub fn config(&self) -> &NavConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    pub fn eta(&self) -> Option<&EtaEstimate> {
        self.eta.as_ref()
    }

    pub fn last_briefing(&self) -> Option<&Briefing> {
        self.briefing.as_ref()
    }

    pub fn logical_position(&self) -> Option<Coordinate> {
        self.logical_position
    }

    pub fn display_position(&self) -> Option<Coordinate> {
        self.logical_position
            .or(self.raw_position.map(|sample| sample.position))
    }

    /// Calendar date closures are checked against.
    pub fn today(&self) -> NaiveDate {
        self.clock.now().date()
    }

    pub fn state(&self) -> ProgressState {
        self.progress.state(self.stops.len())
    }

    fn persist(&mut self) {
        persistence::save_progress(&mut self.store, self.progress.index(), &self.stops, &self.closures);
    }

    fn after_event(&mut self, event: Option<ProgressEvent>) -> Option<ProgressEvent> {
        match event {
            Some(ProgressEvent::Advanced { to, .. }) => {
                self.logical_position = self.stops.get(to - 1).map(|stop| stop.coordinate());
                self.persist();
            }
            Some(ProgressEvent::Retreated { to, .. }) => {
                self.logical_position = match to {
                    0 => self.raw_position.map(|sample| sample.position),
                    _ => self.stops.get(to - 1).map(|stop| stop.coordinate()),
                };
                self.persist();
            }
            _ => {}
        }
        event
    }

    /// Feed a position fix from the device.
    pub fn on_position(&mut self, sample: PositionSample) -> Option<ProgressEvent> {
        self.raw_position = Some(sample);
        if self.logical_position.is_none() {
            self.logical_position = Some(sample.position);
        }
        let event = self.progress.on_position(sample.position, self.stops.as_slice());
        self.after_event(event)
    }

    /// Re-run the arrival scan against the last fix without a new sample.
    pub fn poll(&mut self) -> Option<ProgressEvent> {
        let event = self.progress.evaluate(self.stops.as_slice());
        self.after_event(event)
    }

    pub fn on_dwell_tick(&mut self, token: DwellToken, elapsed: Duration) -> Option<ProgressEvent> {
        let event = self.progress.on_dwell_tick(token, elapsed, self.stops.as_slice());
        self.after_event(event)
    }

    pub fn skip(&mut self) -> Option<ProgressEvent> {
        let event = self.progress.skip(self.stops.as_slice());
        self.after_event(event)
    }

    pub fn back(&mut self) -> Option<ProgressEvent> {
        let event = self.progress.back();
        self.after_event(event)
    }

    /// Append a stop at `at`, or at the last fix when `at` is `None`.
    ///
    /// Returns `false` when there is no address or no position to use.
    pub fn add_stop(&mut self, address: &str, at: Option<Coordinate>) -> bool {
        let address = address.trim();
        let Some(at) = at.or(self.raw_position.map(|sample| sample.position)) else {
            warn!(address, "cannot add a stop without a position fix");
            return false;
        };
        if address.is_empty() {
            debug!("ignoring stop with empty address");
            return false;
        }
        let stop = self.stops.append(address, at);
        info!(address = %stop.address, original_index = stop.original_index, "stop added");
        self.persist();
        true
    }

    /// Register a hand-placed closure and return its id.
    pub fn add_closure(&mut self, draft: ClosureDraft) -> String {
        let closure = RoadClosure::manual(draft.at, draft.start, draft.end, draft.note);
        let id = closure.id.clone();
        self.closures.register(closure);
        self.persist();
        id
    }

    pub fn remove_closure(&mut self, id: &str) -> bool {
        let removed = self.closures.remove(id).is_some();
        if removed {
            self.persist();
        } else {
            debug!(id, "no closure with this id");
        }
        removed
    }

    /// Re-sequence the remaining stops around today's closures.
    pub fn optimize(&mut self) -> Result<OptimizationOutcome, NavError> {
        let ticket = self.begin_optimization();
        self.apply_optimization(ticket)
    }

    /// Capture the closures an optimization should run against.
    pub fn begin_optimization(&self) -> OptimizationTicket {
        let today = self.today();
        OptimizationTicket {
            started_at_index: self.progress.index(),
            closures: self.closures.active(today).into_iter().cloned().collect(),
        }
    }

    /// Apply an optimization against the index current now, not the one
    /// it was started at.
    ///
    /// A running dwell is restarted when the order changed. The resulting
    /// event, with any new token, is returned as `dwell_event`.
    pub fn apply_optimization(&mut self, ticket: OptimizationTicket) -> Result<OptimizationOutcome, NavError> {
        let index = self.progress.index();
        if index != ticket.started_at_index {
            info!(
                started_at = ticket.started_at_index,
                index, "route advanced during optimization, using current index"
            );
        }
        let active: Vec<&RoadClosure> = ticket.closures.iter().collect();
        let mut outcome = self.optimizer.apply(&mut self.stops, index, &active)?;

        if outcome.changed && self.progress.is_arrived() {
            let cancelled = self.progress.cancel_dwell();
            outcome.dwell_event = self.progress.evaluate(self.stops.as_slice()).or(cancelled);
        }
        self.persist();
        Ok(outcome)
    }

    /// Refresh the finish and next-stop estimates from the display position.
    pub fn refresh_eta<P: RouteProvider + ?Sized>(&mut self, provider: &P) -> Option<&EtaEstimate> {
        let remaining = self.stops.slice(self.progress.index(), self.stops.len());
        self.eta = match self.display_position() {
            Some(from) => estimate_eta(provider, from, remaining, &self.config),
            None => {
                debug!("no position yet, skipping ETA");
                None
            }
        };
        self.eta.as_ref()
    }

    /// Ask the briefing service about the next stops and register any
    /// closures it detects for today.
    pub fn run_briefing<P: BriefingProvider + ?Sized>(&mut self, provider: &P) -> &Briefing {
        let index = self.progress.index();
        let upcoming = self.stops.slice(index, index + self.config.briefing_window);
        let result = briefing::run_briefing(provider, upcoming);

        if !result.detections.is_empty() {
            let today = self.today();
            let detected = result
                .detections
                .iter()
                .cloned()
                .map(|detection| detection.into_closure(today))
                .collect();
            self.closures
                .merge_detected(detected, self.config.detection_merge_tolerance_deg);
            self.persist();
        }
        self.briefing.insert(result)
    }

    pub fn admin_login(&mut self, input: &str) -> bool {
        if !self.gate.check(input) {
            info!("admin login rejected");
            return false;
        }
        self.is_admin = true;
        persistence::save_admin(&mut self.store, true);
        info!("admin login");
        true
    }

    pub fn admin_logout(&mut self) {
        self.is_admin = false;
        persistence::save_admin(&mut self.store, false);
        info!("admin logout");
    }

    pub fn view(&self) -> SessionView {
        let today = self.today();
        let active = self.closures.active(today);
        let index = self.progress.index();
        let path = self.eta.as_ref().and_then(|eta| eta.geometry.as_ref());

        SessionView {
            route_type: self.route_type,
            index,
            derived: derive_view(
                self.stops.as_slice(),
                index,
                self.progress.last_position(),
                &active,
                path,
                &self.config,
            ),
            state: self.state(),
            is_arrived: self.progress.is_arrived(),
            arrival_progress: self.progress.arrival_progress(),
            active_arrival_index: self.progress.active_arrival_index(),
            dwell_token: self.progress.active_token(),
            display_position: self.display_position(),
            gps_accuracy_m: self.raw_position.and_then(|sample| sample.accuracy_m),
            active_closures: active.len(),
            eta: self.eta.clone(),
            is_admin: self.is_admin,
        }
    }
}
