//! Dictation session orchestration
//!
//! This module provides the `DictationSession` abstraction that manages:
//! - Microphone capture
//! - The streaming connection to the transcription backend
//! - Transcript accumulation (interim vs final reconciliation)
//! - Silence-driven auto-stop
//! - Session statistics and ordered teardown

mod config;
mod events;
mod session;
mod stats;

pub use config::SessionConfig;
pub use events::SessionEvent;
pub use session::DictationSession;
pub use stats::SessionStats;
