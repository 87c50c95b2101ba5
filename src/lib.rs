pub mod audio;
pub mod config;
pub mod error;
pub mod session;
pub mod stream;
pub mod transcript;
pub mod watchdog;

pub use audio::{AudioBackend, AudioChunk, CaptureConfig, ChunkAssembler, MicrophoneBackend};
pub use config::Config;
pub use error::{CaptureError, TransportError};
pub use session::{DictationSession, SessionConfig, SessionEvent, SessionStats};
pub use stream::{
    build_stream_url, parse_transcript_event, ConnectionState, ConnectionUpdate, Connector,
    OutboundFrame, StreamConnection, TranscriptEvent, TransportEvent, TransportLink, WsConnector,
    CLOSE_STREAM,
};
pub use transcript::TranscriptAccumulator;
pub use watchdog::SilenceWatchdog;
