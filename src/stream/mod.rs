//! Streaming connection to the transcription backend
//!
//! This module provides the connection lifecycle:
//! - `ConnectionState` machine with guarded transitions
//! - Pending-audio queue with flush-once semantics across the
//!   Connecting → Connected transition
//! - Inbound message parsing (malformed payloads are ignored)
//! - WebSocket transport behind the `Connector` seam

pub mod connection;
pub mod messages;
pub mod transport;

pub use connection::{ConnectionState, ConnectionUpdate, StreamConnection};
pub use messages::{parse_transcript_event, TranscriptEvent, CLOSE_STREAM};
pub use transport::{
    build_stream_url, Connector, OutboundFrame, TransportEvent, TransportLink, WsConnector,
};
