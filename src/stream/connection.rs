use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use url::Url;

use super::messages::{parse_transcript_event, TranscriptEvent};
use super::transport::{Connector, OutboundFrame, TransportEvent, TransportLink};
use crate::audio::AudioChunk;
use crate::error::TransportError;

/// Lifecycle state of the backend connection. The single source of truth
/// for whether audio is transmitted, queued, or dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Connecting,
    Connected,
    Error,
}

/// What a handled transport event means to the orchestrator.
#[derive(Debug)]
pub enum ConnectionUpdate {
    /// The handshake completed; queued audio has been flushed
    StateChanged(ConnectionState),
    /// The server closed the stream unprompted; state is now `Closed`
    RemoteClosed,
    /// The transport failed; state is now `Error`
    Failed(String),
    /// One parsed transcript event with non-empty alternative text
    Transcript(TranscriptEvent),
}

/// Owns the connection lifecycle to the transcription backend.
///
/// All methods run on the session's event loop; the connector and socket
/// tasks only communicate through the transport event channel, so every
/// state transition happens here, guarded by the current state.
pub struct StreamConnection {
    connector: Arc<dyn Connector>,
    url: Url,
    state: ConnectionState,
    /// Audio awaiting transmission, populated only while `Connecting`,
    /// drained FIFO exactly once on the transition to `Connected`.
    pending: VecDeque<Vec<u8>>,
    link: Option<TransportLink>,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
}

impl StreamConnection {
    /// Creates a connection and the receiver for its transport events.
    pub fn new(
        connector: Arc<dyn Connector>,
        url: Url,
    ) -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        (
            Self {
                connector,
                url,
                state: ConnectionState::Closed,
                pending: VecDeque::new(),
                link: None,
                events_tx,
            },
            events_rx,
        )
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Number of chunks queued while the handshake is in flight.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Begins a connect attempt, transitioning to `Connecting` immediately.
    ///
    /// A call while already `Connecting` or `Connected` is a no-op; only
    /// one attempt may be in flight. Returns whether an attempt started.
    pub fn connect(&mut self, credential: &str) -> bool {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Connected => {
                debug!("Connect ignored in state {:?}", self.state);
                false
            }
            ConnectionState::Closed | ConnectionState::Error => {
                self.state = ConnectionState::Connecting;

                let connector = Arc::clone(&self.connector);
                let url = self.url.clone();
                let credential = credential.to_string();
                let events = self.events_tx.clone();

                tokio::spawn(async move {
                    connector.connect(url, credential, events).await;
                });

                true
            }
        }
    }

    /// Hands one captured chunk to the transport.
    ///
    /// `Connected`: transmitted immediately. `Connecting`: queued until the
    /// handshake completes. `Closed`/`Error`: dropped silently so capture
    /// never stalls on transport state.
    pub fn send(&mut self, chunk: AudioChunk) {
        match self.state {
            ConnectionState::Connected => {
                if let Some(link) = &self.link {
                    if !link.send(OutboundFrame::Audio(chunk.into_pcm_bytes())) {
                        debug!("Audio chunk dropped, transport writer is gone");
                    }
                }
            }
            ConnectionState::Connecting => {
                self.pending.push_back(chunk.into_pcm_bytes());
            }
            ConnectionState::Closed | ConnectionState::Error => {
                debug!("Audio chunk dropped in state {:?}", self.state);
            }
        }
    }

    /// Applies one transport event to the state machine.
    pub fn handle_event(&mut self, event: TransportEvent) -> Option<ConnectionUpdate> {
        match event {
            TransportEvent::Opened(link) => self.on_opened(link),
            TransportEvent::Message(payload) => self.on_message(&payload),
            TransportEvent::Closed => self.on_remote_closed(),
            TransportEvent::Failed(e) => self.on_failed(e),
        }
    }

    /// Graceful disconnect: sends end-of-stream if connected, then closes
    /// the transport. Idempotent. Returns whether the state changed.
    pub fn disconnect(&mut self) -> bool {
        if let Some(link) = self.link.take() {
            // End-of-stream goes out first; dropping the link then ends the
            // writer, which closes the socket.
            let _ = link.send(OutboundFrame::Finalize);
        }

        self.pending.clear();

        if self.state == ConnectionState::Closed {
            return false;
        }

        self.state = ConnectionState::Closed;
        info!("Transcription connection closed");
        true
    }

    fn on_opened(&mut self, link: TransportLink) -> Option<ConnectionUpdate> {
        if self.state != ConnectionState::Connecting {
            // A handshake that outlived disconnect(); dropping the link
            // closes its socket.
            debug!("Dropping stale transport link in state {:?}", self.state);
            return None;
        }

        let queued = self.pending.len();
        for pcm in self.pending.drain(..) {
            let _ = link.send(OutboundFrame::Audio(pcm));
        }

        self.link = Some(link);
        self.state = ConnectionState::Connected;

        info!("Connected to transcription backend ({} queued chunks flushed)", queued);

        Some(ConnectionUpdate::StateChanged(ConnectionState::Connected))
    }

    fn on_message(&mut self, payload: &str) -> Option<ConnectionUpdate> {
        match parse_transcript_event(payload) {
            Ok(Some(event)) if !event.text.is_empty() => {
                Some(ConnectionUpdate::Transcript(event))
            }
            Ok(_) => None,
            Err(e) => {
                // Backend framing is noisy; never let this reach the UI
                warn!("Ignoring malformed backend message: {}", e);
                None
            }
        }
    }

    fn on_remote_closed(&mut self) -> Option<ConnectionUpdate> {
        match self.state {
            // Reader shutdown echo after a local disconnect or failure
            ConnectionState::Closed | ConnectionState::Error => None,
            ConnectionState::Connecting | ConnectionState::Connected => {
                self.link = None;
                self.pending.clear();
                self.state = ConnectionState::Closed;

                info!("Transcription stream closed by server");

                Some(ConnectionUpdate::RemoteClosed)
            }
        }
    }

    fn on_failed(&mut self, error: TransportError) -> Option<ConnectionUpdate> {
        match self.state {
            ConnectionState::Closed | ConnectionState::Error => None,
            ConnectionState::Connecting | ConnectionState::Connected => {
                self.link = None;
                self.pending.clear();
                self.state = ConnectionState::Error;

                warn!("Transport failed: {}", error);

                Some(ConnectionUpdate::Failed(error.to_string()))
            }
        }
    }
}
