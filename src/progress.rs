//! Route progress state machine.
//!
//! Fuses the latest position fix, the arrival trigger and the dwell timer
//! into the single answer to "where is the driver in the route".
//!
//! States:
//! - `Traveling`: no upcoming stop within trigger distance.
//! - `Arrived(k)`: stop `k >= index` is within trigger distance and its
//!   dwell timer is running.
//! - `Complete`: `index == stops.len()`.
//!
//! The dwell timer is not a live timer here. Whoever drives the machine
//! calls [`RouteProgress::on_dwell_tick`] with the token handed out when
//! the dwell started; ticks carrying any other token are dropped, so a
//! timer left running after a cancel, a skip or a switch to another stop
//! can never advance the route.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::NavConfig;
use crate::haversine::Coordinate;
use crate::stops::Stop;

/// A position fix from the device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSample {
    pub position: Coordinate,
    /// Horizontal accuracy in meters, when the platform reports it.
    pub accuracy_m: Option<f64>,
}

impl PositionSample {
    pub fn new(position: Coordinate) -> Self {
        Self {
            position,
            accuracy_m: None,
        }
    }
}

/// Identifies one dwell. A new token is issued every time a dwell starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DwellToken(u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressState {
    Traveling,
    Arrived { stop_index: usize, elapsed: Duration },
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceCause {
    Arrival,
    Skip,
}

/// Transitions reported back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Start ticking the dwell timer with this token.
    DwellStarted { stop_index: usize, token: DwellToken },
    DwellCancelled { stop_index: usize },
    /// `index` moved forward. Stops in `from..to - 1` were passed over.
    Advanced { from: usize, to: usize, cause: AdvanceCause },
    Retreated { from: usize, to: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Dwell {
    stop_index: usize,
    elapsed: Duration,
    token: DwellToken,
}

/// First stop at or after `index` that is strictly closer than the trigger
/// distance.
///
/// This is not necessarily `stops[index]`: the driver may be standing at a
/// later stop than the nominal current one.
pub fn find_trigger_stop(
    stops: &[Stop],
    index: usize,
    position: &Coordinate,
    trigger_distance_m: f64,
) -> Option<usize> {
    stops
        .iter()
        .enumerate()
        .skip(index)
        .find(|(_, stop)| stop.coordinate().distance_to(position) < trigger_distance_m)
        .map(|(i, _)| i)
}

#[derive(Debug, Clone)]
pub struct RouteProgress {
    index: usize,
    dwell: Option<Dwell>,
    last_position: Option<Coordinate>,
    next_token: u64,
    trigger_distance_m: f64,
    dwell_duration: Duration,
}

impl RouteProgress {
    pub fn new(index: usize, trigger_distance_m: f64, dwell_duration: Duration) -> Self {
        Self {
            index,
            dwell: None,
            last_position: None,
            next_token: 0,
            trigger_distance_m,
            dwell_duration,
        }
    }

    pub fn from_config(config: &NavConfig, index: usize) -> Self {
        Self::new(index, config.trigger_distance_m, config.dwell_duration)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn last_position(&self) -> Option<Coordinate> {
        self.last_position
    }

    pub fn is_arrived(&self) -> bool {
        self.dwell.is_some()
    }

    pub fn active_arrival_index(&self) -> Option<usize> {
        self.dwell.map(|d| d.stop_index)
    }

    pub fn active_token(&self) -> Option<DwellToken> {
        self.dwell.map(|d| d.token)
    }

    /// Dwell completion in percent, 0 when not dwelling.
    pub fn arrival_progress(&self) -> f64 {
        match self.dwell {
            Some(dwell) => {
                let ratio = dwell.elapsed.as_secs_f64() / self.dwell_duration.as_secs_f64();
                (ratio * 100.0).min(100.0)
            }
            None => 0.0,
        }
    }

    pub fn state(&self, stops_len: usize) -> ProgressState {
        match self.dwell {
            Some(dwell) if dwell.stop_index < stops_len => ProgressState::Arrived {
                stop_index: dwell.stop_index,
                elapsed: dwell.elapsed,
            },
            _ if self.index >= stops_len => ProgressState::Complete,
            _ => ProgressState::Traveling,
        }
    }

    /// Pull the index and any dwell back inside a list of `stops_len` stops.
    pub fn clamp_to(&mut self, stops_len: usize) {
        if self.index > stops_len {
            warn!(index = self.index, stops_len, "index past end of stop list, clamping");
            self.index = stops_len;
        }
        if self.dwell.is_some_and(|d| d.stop_index >= stops_len) {
            warn!(stops_len, "dwelling on a stop past the end of the list, cancelling");
            self.dwell = None;
        }
    }

    /// Record a new fix and re-run the arrival scan.
    pub fn on_position(&mut self, position: Coordinate, stops: &[Stop]) -> Option<ProgressEvent> {
        self.last_position = Some(position);
        self.evaluate(stops)
    }

    /// Re-run the arrival scan against the last known position.
    ///
    /// Does nothing until a first fix has been recorded. Without new fixes
    /// the machine simply stays where it is.
    pub fn evaluate(&mut self, stops: &[Stop]) -> Option<ProgressEvent> {
        let position = self.last_position?;
        self.clamp_to(stops.len());

        let found = find_trigger_stop(stops, self.index, &position, self.trigger_distance_m);
        match (found, self.dwell) {
            (Some(stop_index), Some(dwell)) if dwell.stop_index == stop_index => None,
            (Some(stop_index), _) => {
                let token = self.start_dwell(stop_index);
                Some(ProgressEvent::DwellStarted { stop_index, token })
            }
            (None, Some(_)) => self.cancel_dwell(),
            (None, None) => None,
        }
    }

    fn start_dwell(&mut self, stop_index: usize) -> DwellToken {
        if let Some(previous) = self.dwell.take() {
            debug!(
                previous = previous.stop_index,
                stop_index, "switching dwell to a different stop"
            );
        }
        let token = DwellToken(self.next_token);
        self.next_token += 1;
        self.dwell = Some(Dwell {
            stop_index,
            elapsed: Duration::ZERO,
            token,
        });
        info!(stop_index, index = self.index, "arrived, dwell started");
        token
    }

    /// Drop any running dwell. Its token becomes stale.
    pub fn cancel_dwell(&mut self) -> Option<ProgressEvent> {
        let dwell = self.dwell.take()?;
        info!(stop_index = dwell.stop_index, elapsed = ?dwell.elapsed, "dwell cancelled");
        Some(ProgressEvent::DwellCancelled {
            stop_index: dwell.stop_index,
        })
    }

    /// Feed `elapsed` time since the previous tick into the running dwell.
    ///
    /// Ticks for any dwell other than the running one are ignored.
    pub fn on_dwell_tick(
        &mut self,
        token: DwellToken,
        elapsed: Duration,
        stops: &[Stop],
    ) -> Option<ProgressEvent> {
        let dwell_duration = self.dwell_duration;
        let Some(dwell) = self.dwell.as_mut() else {
            debug!(?token, "dwell tick with no running dwell");
            return None;
        };
        if dwell.token != token {
            debug!(?token, current = ?dwell.token, "ignoring stale dwell tick");
            return None;
        }

        dwell.elapsed = dwell.elapsed.saturating_add(elapsed);
        if dwell.elapsed >= dwell_duration {
            self.on_dwell_complete(stops)
        } else {
            None
        }
    }

    /// Mark the dwelling stop complete and move past it.
    ///
    /// Any stops between the old index and the dwelling stop are passed
    /// over with it.
    fn on_dwell_complete(&mut self, stops: &[Stop]) -> Option<ProgressEvent> {
        let dwell = self.dwell.take()?;
        if dwell.stop_index >= stops.len() {
            warn!(stop_index = dwell.stop_index, stops_len = stops.len(), "dwell completed on a missing stop");
            self.index = self.index.min(stops.len());
            return None;
        }

        let from = self.index;
        self.index = dwell.stop_index + 1;
        info!(from, to = self.index, "stop completed");
        Some(ProgressEvent::Advanced {
            from,
            to: self.index,
            cause: AdvanceCause::Arrival,
        })
    }

    /// Complete the current stop without a dwell.
    pub fn skip(&mut self, stops: &[Stop]) -> Option<ProgressEvent> {
        self.cancel_dwell();
        if self.index >= stops.len() {
            self.index = stops.len();
            return None;
        }

        let from = self.index;
        self.index += 1;
        info!(from, to = self.index, "stop skipped");
        Some(ProgressEvent::Advanced {
            from,
            to: self.index,
            cause: AdvanceCause::Skip,
        })
    }

    /// Step back one stop. Cancels any running dwell.
    pub fn back(&mut self) -> Option<ProgressEvent> {
        self.cancel_dwell();
        if self.index == 0 {
            return None;
        }

        let from = self.index;
        self.index -= 1;
        info!(from, to = self.index, "stepped back");
        Some(ProgressEvent::Retreated { from, to: self.index })
    }
}
