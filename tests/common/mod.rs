// Shared fakes for the capture and transport seams.
//
// ScriptedBackend lets a test feed audio chunks from the test body;
// FakeConnector hands each handshake attempt to the test so it can decide
// when (and whether) the connection opens, and inject inbound traffic.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use url::Url;
use voicepane::{
    AudioBackend, AudioChunk, CaptureError, Connector, OutboundFrame, TransportError,
    TransportEvent, TransportLink,
};

/// Audio backend driven from the test body instead of a device.
pub struct ScriptedBackend {
    feed: Mutex<Option<mpsc::UnboundedReceiver<AudioChunk>>>,
    capturing: AtomicBool,
    stopped: Arc<AtomicBool>,
}

impl ScriptedBackend {
    /// Returns the backend, the sender that stands in for the microphone,
    /// and a flag set once the session stops the backend.
    pub fn new() -> (
        Box<ScriptedBackend>,
        mpsc::UnboundedSender<AudioChunk>,
        Arc<AtomicBool>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let stopped = Arc::new(AtomicBool::new(false));

        let backend = Box::new(ScriptedBackend {
            feed: Mutex::new(Some(rx)),
            capturing: AtomicBool::new(false),
            stopped: Arc::clone(&stopped),
        });

        (backend, tx, stopped)
    }
}

#[async_trait::async_trait]
impl AudioBackend for ScriptedBackend {
    async fn start(&mut self) -> Result<mpsc::UnboundedReceiver<AudioChunk>, CaptureError> {
        let rx = self
            .feed
            .lock()
            .expect("feed lock")
            .take()
            .ok_or_else(|| CaptureError::DeviceUnavailable("already started".to_string()))?;

        self.capturing.store(true, Ordering::SeqCst);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        self.capturing.store(false, Ordering::SeqCst);
        self.stopped.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Backend whose device acquisition always fails.
pub struct DeniedBackend;

#[async_trait::async_trait]
impl AudioBackend for DeniedBackend {
    async fn start(&mut self) -> Result<mpsc::UnboundedReceiver<AudioChunk>, CaptureError> {
        Err(CaptureError::PermissionDenied(
            "microphone access denied".to_string(),
        ))
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "denied"
    }
}

/// One handshake attempt captured by the fake connector. The test decides
/// its outcome and injects inbound traffic afterwards.
pub struct HandshakeRequest {
    pub url: Url,
    pub credential: String,
    pub events: mpsc::UnboundedSender<TransportEvent>,
}

impl HandshakeRequest {
    /// Completes the handshake; returns the receiver observing everything
    /// the session sends outbound.
    pub fn open(&self) -> mpsc::UnboundedReceiver<OutboundFrame> {
        let (link, outbound_rx) = TransportLink::pair();
        self.events
            .send(TransportEvent::Opened(link))
            .expect("session dropped transport events");
        outbound_rx
    }

    pub fn fail(&self, message: &str) {
        self.events
            .send(TransportEvent::Failed(TransportError::Handshake(
                message.to_string(),
            )))
            .expect("session dropped transport events");
    }

    pub fn fail_connection(&self, message: &str) {
        self.events
            .send(TransportEvent::Failed(TransportError::Connection(
                message.to_string(),
            )))
            .expect("session dropped transport events");
    }

    pub fn message(&self, payload: &str) {
        self.events
            .send(TransportEvent::Message(payload.to_string()))
            .expect("session dropped transport events");
    }

    pub fn close(&self) {
        self.events
            .send(TransportEvent::Closed)
            .expect("session dropped transport events");
    }
}

/// Connector that forwards every connect attempt to the test.
pub struct FakeConnector {
    handshakes: mpsc::UnboundedSender<HandshakeRequest>,
}

impl FakeConnector {
    pub fn new() -> (Arc<FakeConnector>, mpsc::UnboundedReceiver<HandshakeRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(FakeConnector { handshakes: tx }), rx)
    }
}

#[async_trait::async_trait]
impl Connector for FakeConnector {
    async fn connect(
        &self,
        url: Url,
        credential: String,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) {
        let _ = self.handshakes.send(HandshakeRequest {
            url,
            credential,
            events,
        });
    }
}

/// A 4-sample chunk whose PCM bytes identify it by marker value.
pub fn test_chunk(marker: i16) -> AudioChunk {
    AudioChunk {
        samples: vec![marker; 4],
        sample_rate: 16000,
        channels: 1,
        timestamp_ms: 0,
    }
}

/// Expected wire bytes for `test_chunk(marker)`.
pub fn test_chunk_bytes(marker: i16) -> Vec<u8> {
    test_chunk(marker).into_pcm_bytes()
}

/// Interim transcription result payload in the backend's wire shape.
pub fn interim_payload(text: &str) -> String {
    format!(
        r#"{{"type":"Results","is_final":false,"channel":{{"alternatives":[{{"transcript":"{}"}}]}}}}"#,
        text
    )
}

/// Final transcription result payload in the backend's wire shape.
pub fn final_payload(text: &str) -> String {
    format!(
        r#"{{"type":"Results","is_final":true,"channel":{{"alternatives":[{{"transcript":"{}"}}]}}}}"#,
        text
    )
}

/// Lets the session loop drain everything already queued on its channels.
pub async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}
