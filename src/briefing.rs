//! Road-intel briefings for the upcoming stops.
//!
//! Two calls to the briefing service: a search-grounded narrative report,
//! then a structured extraction of which stops are blocked. Each half
//! degrades on its own. A failed report shows the offline message but the
//! extraction still runs against the stop list alone. A failed or
//! malformed extraction yields no detections.

use chrono::NaiveDate;
use serde_json::Value;
use tracing::{info, warn};

use crate::closures::RoadClosure;
use crate::haversine::Coordinate;
use crate::stops::Stop;
use crate::traits::{BriefingProvider, Source};

pub const OFFLINE_TEXT: &str =
    "Briefing system offline. Manual check of Cambridgeshire roadworks portal advised.";
pub const NO_REPORT_TEXT: &str = "No specific roadworks reported on your route.";

const ROADWORKS_PORTAL: &str = "https://www.cambridgeshire.gov.uk/residents/travel-roads-and-parking/roads-and-pathways/roadworks-and-faults/roadwork-and-traffic-information";

/// A stop the extraction step reported as blocked or delayed.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub lat: f64,
    pub lng: f64,
    pub note: String,
}

impl Detection {
    pub fn into_closure(self, today: NaiveDate) -> RoadClosure {
        RoadClosure::detected(Coordinate::new(self.lat, self.lng), today, &self.note)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Briefing {
    pub text: String,
    pub sources: Vec<Source>,
    pub detections: Vec<Detection>,
    /// The narrative call failed and `text` is the offline message.
    pub offline: bool,
}

pub fn report_prompt(upcoming: &[Stop]) -> String {
    let streets = upcoming
        .iter()
        .map(|stop| stop.address.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Search {ROADWORKS_PORTAL} and live news for road closures or heavy delays in Cambridge tonight. \
         Focus strictly on the following streets: {streets}. \
         Identify if any of these specific streets are blocked. Provide a professional driver summary \
         and advice on how to handle the route (e.g., skip the street or approach from a different side)."
    )
}

/// Prompt for the structured extraction call. Without a report the model is
/// asked to check the stops against live closure information directly.
pub fn extraction_prompt(report: Option<&str>, upcoming: &[Stop]) -> String {
    let stops = Value::Array(
        upcoming
            .iter()
            .map(|stop| serde_json::json!({ "addr": stop.address, "lat": stop.lat, "lng": stop.lng }))
            .collect(),
    );
    let lead = match report {
        Some(report) => format!(
            "Based on the following traffic report: \"{report}\", identify which of these stops are likely blocked."
        ),
        None => "Check live road closure and roadworks information in Cambridge tonight and identify \
                 which of these stops are likely blocked."
            .to_string(),
    };
    format!(
        "{lead} \
         STOPS LIST: {stops} \
         Return only a JSON array of objects with {{lat, lng, note}} for each stop that is clearly mentioned \
         as blocked or delayed. If none, return []."
    )
}

/// Parse the extraction output, keeping only well-formed detections.
///
/// Anything that is not a JSON array yields no detections. Array items
/// need finite, in-range `lat`/`lng` numbers and a string `note`.
pub fn parse_detections(raw: &str) -> Vec<Detection> {
    let value: Value = match serde_json::from_str(strip_code_fence(raw)) {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, "extraction output is not JSON, assuming no detections");
            return Vec::new();
        }
    };
    let Value::Array(items) = value else {
        warn!("extraction output is not a JSON array, assuming no detections");
        return Vec::new();
    };

    let total = items.len();
    let detections: Vec<Detection> = items.iter().filter_map(parse_detection).collect();
    if detections.len() < total {
        warn!(dropped = total - detections.len(), "dropped malformed detections");
    }
    detections
}

fn parse_detection(item: &Value) -> Option<Detection> {
    let lat = item.get("lat")?.as_f64()?;
    let lng = item.get("lng")?.as_f64()?;
    let note = item.get("note")?.as_str()?;
    let in_range = lat.is_finite()
        && lng.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lng);
    in_range.then(|| Detection {
        lat,
        lng,
        note: note.to_string(),
    })
}

/// Models sometimes wrap JSON in a markdown fence despite the mime type.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Produce a briefing for `upcoming` stops.
///
/// Never fails; see the module docs for how each half degrades.
pub fn run_briefing<P: BriefingProvider + ?Sized>(provider: &P, upcoming: &[Stop]) -> Briefing {
    let report = match provider.search_report(&report_prompt(upcoming)) {
        Ok(report) => Some(report),
        Err(err) => {
            warn!(error = %err, "briefing report failed, extracting from stop list only");
            None
        }
    };

    let text = match &report {
        Some(report) if !report.text.trim().is_empty() => report.text.clone(),
        Some(_) => NO_REPORT_TEXT.to_string(),
        None => OFFLINE_TEXT.to_string(),
    };
    let grounding = report.as_ref().map(|_| text.as_str());

    let detections = match provider.extract_json(&extraction_prompt(grounding, upcoming)) {
        Ok(raw) => parse_detections(&raw),
        Err(err) => {
            warn!(error = %err, "closure extraction failed");
            Vec::new()
        }
    };
    let offline = report.is_none();
    let sources = report.map(|report| report.sources).unwrap_or_default();
    info!(
        stops = upcoming.len(),
        sources = sources.len(),
        detections = detections.len(),
        offline,
        "briefing ready"
    );

    Briefing {
        text,
        sources,
        detections,
        offline,
    }
}
