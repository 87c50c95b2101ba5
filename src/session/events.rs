use crate::stream::ConnectionState;

/// Events emitted by a dictation session to its host application.
///
/// The host (window shell, CLI) consumes these from the receiver returned
/// by `DictationSession::start`; the session never calls back into UI code.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The transcript body changed; carries the full transcript
    TranscriptUpdate(String),

    /// The backend connection changed state
    ConnectionState(ConnectionState),

    /// A user-facing error message; the most recent one wins
    Error(String),

    /// The silence watchdog requested stop-and-finalize
    AutoStop,
}
