use tokio::time::Instant;

use crate::stream::TranscriptEvent;

/// Merges partial and final transcript events into one stable transcript.
///
/// The transcript body only ever grows by appending finalized text,
/// space-separated, in arrival order; interim events refresh the
/// last-speech instant but never touch the body.
pub struct TranscriptAccumulator {
    transcript: String,
    last_speech: Instant,
    speech_observed: bool,
}

impl TranscriptAccumulator {
    pub fn new(now: Instant) -> Self {
        Self {
            transcript: String::new(),
            last_speech: now,
            speech_observed: false,
        }
    }

    /// The accumulated transcript (finalized segments only).
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    /// When the most recent non-empty event arrived (or the last reset).
    pub fn last_speech(&self) -> Instant {
        self.last_speech
    }

    /// Whether any non-empty event arrived since the last reset.
    pub fn speech_observed(&self) -> bool {
        self.speech_observed
    }

    /// Applies one event. Returns whether the transcript body changed.
    pub fn apply(&mut self, event: &TranscriptEvent, now: Instant) -> bool {
        let text = event.text.trim();
        if text.is_empty() {
            return false;
        }

        self.last_speech = now;
        self.speech_observed = true;

        if !event.is_final {
            return false;
        }

        if self.transcript.is_empty() {
            self.transcript.push_str(text);
        } else {
            self.transcript.push(' ');
            self.transcript.push_str(text);
        }

        true
    }

    /// Clears the transcript and refreshes the last-speech instant. Called
    /// once per new recording session, before the connection is opened.
    pub fn reset(&mut self, now: Instant) {
        self.transcript.clear();
        self.last_speech = now;
        self.speech_observed = false;
    }
}
