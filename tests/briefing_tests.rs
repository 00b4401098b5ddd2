//! Briefing tests
//!
//! Partial success handling and validation of extraction output.

mod fixtures;

use fixtures::{ScriptedBriefing, TOWN, date};
use night_route::briefing::{
    Detection, NO_REPORT_TEXT, OFFLINE_TEXT, parse_detections, run_briefing,
};
use night_route::stops::StopList;

// ============================================================================
// Helper Functions
// ============================================================================

fn upcoming() -> StopList {
    StopList::from_template(&TOWN.iter().map(|l| l.template_stop()).collect::<Vec<_>>())
}

// ============================================================================
// Extraction Parsing Tests
// ============================================================================

#[test]
fn test_parses_well_formed_detections() {
    let raw = r#"[{"lat": 52.1985, "lng": 0.1408, "note": "Bridge closed"}]"#;
    assert_eq!(
        parse_detections(raw),
        vec![Detection {
            lat: 52.1985,
            lng: 0.1408,
            note: "Bridge closed".to_string(),
        }]
    );
}

#[test]
fn test_non_json_output_means_no_detections() {
    assert!(parse_detections("Sorry, I could not find anything.").is_empty());
    assert!(parse_detections("").is_empty());
}

#[test]
fn test_wrong_shape_means_no_detections() {
    assert!(parse_detections(r#"{"lat": 52.2, "lng": 0.1, "note": "x"}"#).is_empty());
    assert!(parse_detections("42").is_empty());
}

#[test]
fn test_invalid_items_are_dropped() {
    let raw = r#"[
        {"lat": 52.2, "lng": 0.13, "note": "ok"},
        {"lat": "52.2", "lng": 0.13, "note": "string lat"},
        {"lat": 95.0, "lng": 0.13, "note": "out of range"},
        {"lat": 52.2, "lng": -181.0, "note": "out of range"},
        {"lat": 52.2, "lng": 0.13},
        {"lat": 52.2, "lng": 0.13, "note": 7},
        "not an object"
    ]"#;
    let detections = parse_detections(raw);
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].note, "ok");
}

#[test]
fn test_fenced_json_is_accepted() {
    let raw = "```json\n[{\"lat\": 52.2, \"lng\": 0.13, \"note\": \"x\"}]\n```";
    assert_eq!(parse_detections(raw).len(), 1);
}

// ============================================================================
// Partial Success Tests
// ============================================================================

#[test]
fn test_report_failure_is_offline() {
    let briefing = run_briefing(&ScriptedBriefing::offline(), upcoming().as_slice());
    assert!(briefing.offline);
    assert_eq!(briefing.text, OFFLINE_TEXT);
    assert!(briefing.sources.is_empty());
    assert!(briefing.detections.is_empty());
}

#[test]
fn test_report_failure_still_extracts_detections() {
    let extraction = format!(
        r#"[{{"lat": {}, "lng": {}, "note": "Mill Road bridge closed"}}]"#,
        TOWN[3].lat, TOWN[3].lng
    );
    let provider = ScriptedBriefing::new("", &extraction).report_fails();

    let briefing = run_briefing(&provider, upcoming().as_slice());

    assert!(briefing.offline);
    assert_eq!(briefing.text, OFFLINE_TEXT);
    assert!(briefing.sources.is_empty());
    assert_eq!(briefing.detections.len(), 1);
    assert_eq!(briefing.detections[0].note, "Mill Road bridge closed");

    let prompts = provider.prompts.borrow();
    assert_eq!(prompts.len(), 2);
    assert!(!prompts[1].contains("traffic report"));
    assert!(!prompts[1].contains(OFFLINE_TEXT));
    assert!(prompts[1].contains(r#""addr":"Mill Road""#));
}

#[test]
fn test_empty_report_gets_default_text() {
    let provider = ScriptedBriefing::new("  ", "[]");
    let briefing = run_briefing(&provider, upcoming().as_slice());
    assert_eq!(briefing.text, NO_REPORT_TEXT);
    assert!(!briefing.offline);
}

#[test]
fn test_extraction_failure_keeps_report_and_sources() {
    let provider = ScriptedBriefing::new("Roadworks on Hills Road.", "[]").extraction_fails();
    let briefing = run_briefing(&provider, upcoming().as_slice());
    assert_eq!(briefing.text, "Roadworks on Hills Road.");
    assert_eq!(briefing.sources.len(), 1);
    assert!(briefing.detections.is_empty());
}

#[test]
fn test_malformed_extraction_keeps_report() {
    let provider = ScriptedBriefing::new("Roadworks on Hills Road.", "[{\"lat\": 52.19");
    let briefing = run_briefing(&provider, upcoming().as_slice());
    assert!(!briefing.offline);
    assert_eq!(briefing.text, "Roadworks on Hills Road.");
    assert!(briefing.detections.is_empty());
}

// ============================================================================
// Prompt and Conversion Tests
// ============================================================================

#[test]
fn test_extraction_prompt_lists_stop_coordinates() {
    let stops = upcoming();
    let provider = ScriptedBriefing::new("Clear.", "[]");
    run_briefing(&provider, stops.slice(0, 2));

    let prompts = provider.prompts.borrow();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].contains(r#""addr":"Regent Street""#));
    assert!(prompts[1].contains(r#""lat":52.201"#));
    assert!(!prompts[1].contains("Station Road"));
}

#[test]
fn test_detection_becomes_single_day_closure() {
    let detection = Detection {
        lat: 52.2,
        lng: 0.13,
        note: "Gas works".to_string(),
    };
    let closure = detection.into_closure(date(2024, 3, 4));
    assert!(closure.id.starts_with("auto-"));
    assert_eq!(closure.note, "AUTO: Gas works");
    assert!(closure.is_active(date(2024, 3, 4)));
    assert!(!closure.is_active(date(2024, 3, 5)));
}
