use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a dictation session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier
    pub session_id: String,

    /// Streaming endpoint base URL (query parameters are appended)
    pub endpoint: String,

    /// Recognition model requested from the backend
    pub model: String,

    /// Static bearer-style credential for the backend
    pub credential: String,

    /// Quiet period after which the session auto-stops.
    /// Duration::ZERO disables the silence watchdog.
    pub silence_timeout: Duration,

    /// Sample rate for captured audio (16kHz linear PCM)
    pub sample_rate: u32,

    /// Number of audio channels (1 = mono)
    pub channels: u16,

    /// Audio chunk cadence in milliseconds
    pub chunk_interval_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("dictation-{}", uuid::Uuid::new_v4()),
            endpoint: "wss://api.deepgram.com/v1/listen".to_string(),
            model: "nova-2".to_string(),
            credential: String::new(),
            silence_timeout: Duration::from_secs(8),
            sample_rate: 16000,
            channels: 1,
            chunk_interval_ms: 250,
        }
    }
}
