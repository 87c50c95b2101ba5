// Tests for interim/final transcript reconciliation.
//
// The transcript body must only ever grow by appending finalized text;
// interim results update recency state and nothing else.

use std::time::Duration;
use tokio::time::Instant;
use voicepane::{TranscriptAccumulator, TranscriptEvent};

fn interim(text: &str) -> TranscriptEvent {
    TranscriptEvent {
        text: text.to_string(),
        is_final: false,
    }
}

fn fin(text: &str) -> TranscriptEvent {
    TranscriptEvent {
        text: text.to_string(),
        is_final: true,
    }
}

#[tokio::test]
async fn interim_then_final_keeps_only_final_text() {
    let now = Instant::now();
    let mut acc = TranscriptAccumulator::new(now);

    // Interim precedes the final with different text
    assert!(!acc.apply(&interim("the cat"), now));
    assert_eq!(acc.transcript(), "");

    assert!(acc.apply(&fin("the cat sat"), now));
    assert_eq!(acc.transcript(), "the cat sat");
}

#[tokio::test]
async fn finals_are_space_joined_in_arrival_order() {
    let now = Instant::now();
    let mut acc = TranscriptAccumulator::new(now);

    acc.apply(&fin("hello"), now);
    acc.apply(&fin("world"), now);
    assert_eq!(acc.transcript(), "hello world");

    acc.apply(&fin("again"), now);
    assert_eq!(acc.transcript(), "hello world again");
}

#[tokio::test]
async fn interim_refreshes_last_speech_but_never_the_body() {
    let t0 = Instant::now();
    let mut acc = TranscriptAccumulator::new(t0);

    acc.apply(&fin("hello"), t0);

    let t1 = t0 + Duration::from_secs(5);
    let changed = acc.apply(&interim("hello wor"), t1);

    assert!(!changed);
    assert_eq!(acc.transcript(), "hello");
    assert_eq!(acc.last_speech(), t1);
}

#[tokio::test]
async fn empty_and_whitespace_events_are_inert() {
    let t0 = Instant::now();
    let mut acc = TranscriptAccumulator::new(t0);

    let t1 = t0 + Duration::from_secs(1);
    assert!(!acc.apply(&fin(""), t1));
    assert!(!acc.apply(&interim("   "), t1));

    // Neither the body nor the recency state moved
    assert_eq!(acc.transcript(), "");
    assert_eq!(acc.last_speech(), t0);
    assert!(!acc.speech_observed());
}

#[tokio::test]
async fn final_text_is_trimmed_before_appending() {
    let now = Instant::now();
    let mut acc = TranscriptAccumulator::new(now);

    acc.apply(&fin("  hello  "), now);
    acc.apply(&fin("world"), now);

    assert_eq!(acc.transcript(), "hello world");
}

#[tokio::test]
async fn reset_matches_a_fresh_accumulator() {
    let t0 = Instant::now();

    let mut used = TranscriptAccumulator::new(t0);
    used.apply(&fin("stale"), t0);
    used.apply(&interim("more stale"), t0);

    let t1 = t0 + Duration::from_secs(2);
    used.reset(t1);

    assert_eq!(used.transcript(), "");
    assert_eq!(used.last_speech(), t1);
    assert!(!used.speech_observed());

    // Same event sequence against reset and fresh accumulators
    let mut fresh = TranscriptAccumulator::new(t1);
    for event in [interim("the"), fin("the quick"), fin("fox")] {
        used.apply(&event, t1);
        fresh.apply(&event, t1);
    }

    assert_eq!(used.transcript(), fresh.transcript());
    assert_eq!(used.transcript(), "the quick fox");
}

#[tokio::test]
async fn speech_observed_tracks_any_nonempty_event() {
    let now = Instant::now();
    let mut acc = TranscriptAccumulator::new(now);

    assert!(!acc.speech_observed());

    acc.apply(&interim("hm"), now);
    assert!(acc.speech_observed());
    assert_eq!(acc.transcript(), "");
}
