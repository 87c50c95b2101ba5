use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Statistics about a dictation session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Whether recording is currently active
    pub is_recording: bool,

    /// When the session was created
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Number of audio chunks captured from the microphone
    pub chunks_captured: usize,

    /// Number of chunks handed to the transport (transmitted or queued
    /// for the handshake flush). Chunks captured while the connection is
    /// closed or errored are dropped and not counted here.
    pub chunks_sent: usize,

    /// Number of transcript events received from the backend
    pub transcript_events: usize,
}
