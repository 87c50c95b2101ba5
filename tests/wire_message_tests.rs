// Tests for backend wire message parsing.
//
// The stream is noisy by contract: unrelated message types and malformed
// payloads must parse away quietly instead of producing events.

use voicepane::{parse_transcript_event, CLOSE_STREAM};

#[test]
fn parses_a_final_result() {
    let payload = r#"{
        "type": "Results",
        "is_final": true,
        "channel": { "alternatives": [ { "transcript": "hello world", "confidence": 0.98 } ] },
        "duration": 1.25,
        "start": 0.0
    }"#;

    let event = parse_transcript_event(payload).unwrap().unwrap();
    assert_eq!(event.text, "hello world");
    assert!(event.is_final);
}

#[test]
fn parses_an_interim_result() {
    let payload = r#"{
        "type": "Results",
        "is_final": false,
        "channel": { "alternatives": [ { "transcript": "hello wor" } ] }
    }"#;

    let event = parse_transcript_event(payload).unwrap().unwrap();
    assert_eq!(event.text, "hello wor");
    assert!(!event.is_final);
}

#[test]
fn takes_the_first_alternative() {
    let payload = r#"{
        "type": "Results",
        "is_final": true,
        "channel": { "alternatives": [
            { "transcript": "first" },
            { "transcript": "second" }
        ] }
    }"#;

    let event = parse_transcript_event(payload).unwrap().unwrap();
    assert_eq!(event.text, "first");
}

#[test]
fn unrelated_message_types_yield_no_event() {
    let payload = r#"{ "type": "Metadata", "request_id": "abc-123" }"#;
    assert!(parse_transcript_event(payload).unwrap().is_none());
}

#[test]
fn missing_channel_yields_no_event() {
    let payload = r#"{ "type": "Results", "is_final": true }"#;
    assert!(parse_transcript_event(payload).unwrap().is_none());
}

#[test]
fn empty_alternatives_yield_no_event() {
    let payload = r#"{ "type": "Results", "channel": { "alternatives": [] } }"#;
    assert!(parse_transcript_event(payload).unwrap().is_none());
}

#[test]
fn empty_transcript_text_is_preserved_for_the_caller() {
    // The connection layer decides what to do with empty text; parsing
    // itself succeeds
    let payload = r#"{
        "type": "Results",
        "is_final": false,
        "channel": { "alternatives": [ { "transcript": "" } ] }
    }"#;

    let event = parse_transcript_event(payload).unwrap().unwrap();
    assert_eq!(event.text, "");
}

#[test]
fn malformed_payloads_are_errors() {
    assert!(parse_transcript_event("not json at all").is_err());
    assert!(parse_transcript_event(r#"{"channel": 42}"#).is_err());
    assert!(parse_transcript_event("").is_err());
}

#[test]
fn close_stream_control_message_shape() {
    let value: serde_json::Value = serde_json::from_str(CLOSE_STREAM).unwrap();
    assert_eq!(value["type"], "CloseStream");
}
