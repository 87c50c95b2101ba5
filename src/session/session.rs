use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::config::SessionConfig;
use super::events::SessionEvent;
use super::stats::SessionStats;
use crate::audio::{AudioBackend, AudioChunk, CaptureConfig, MicrophoneBackend};
use crate::stream::{
    build_stream_url, ConnectionState, ConnectionUpdate, Connector, StreamConnection,
    TransportEvent, WsConnector,
};
use crate::transcript::TranscriptAccumulator;
use crate::watchdog::SilenceWatchdog;

/// A dictation session that manages microphone capture, the streaming
/// connection to the transcription backend, transcript accumulation, and
/// silence-driven auto-stop.
///
/// One session object covers one recording: `start` once, `stop` once.
/// Every mutation of connection state, transcript, pending audio, and the
/// silence timer happens on the session's single event-loop task; the
/// capture thread and socket tasks only feed channels.
pub struct DictationSession {
    config: SessionConfig,

    /// Opens connections to the transcription backend
    connector: Arc<dyn Connector>,

    /// Capture backend, consumed by the event loop at start
    backend: Mutex<Option<Box<dyn AudioBackend>>>,

    /// Whether recording is currently active
    is_recording: Arc<AtomicBool>,

    /// When the session was created
    started_at: chrono::DateTime<Utc>,

    /// Chunks captured from the microphone
    chunks_captured: Arc<AtomicUsize>,

    /// Chunks handed to the transport (transmitted or queued)
    chunks_sent: Arc<AtomicUsize>,

    /// Transcript events received from the backend
    transcript_events: Arc<AtomicUsize>,

    /// Snapshot of the accumulated transcript, written only by the loop
    transcript_snapshot: Arc<std::sync::Mutex<String>>,

    /// Command channel into the event loop
    command_tx: Mutex<Option<mpsc::UnboundedSender<Command>>>,

    /// Handle for the event-loop task
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

enum Command {
    Stop(oneshot::Sender<()>),
}

impl DictationSession {
    /// Create a session backed by the real microphone and WebSocket
    /// transport.
    pub fn new(config: SessionConfig) -> Self {
        let capture = CaptureConfig {
            sample_rate: config.sample_rate,
            channels: config.channels,
            chunk_interval_ms: config.chunk_interval_ms,
        };

        Self::with_parts(
            config,
            Arc::new(WsConnector),
            Box::new(MicrophoneBackend::new(capture)),
        )
    }

    /// Create a session with explicit capture and transport seams.
    pub fn with_parts(
        config: SessionConfig,
        connector: Arc<dyn Connector>,
        backend: Box<dyn AudioBackend>,
    ) -> Self {
        Self {
            config,
            connector,
            backend: Mutex::new(Some(backend)),
            is_recording: Arc::new(AtomicBool::new(false)),
            started_at: Utc::now(),
            chunks_captured: Arc::new(AtomicUsize::new(0)),
            chunks_sent: Arc::new(AtomicUsize::new(0)),
            transcript_events: Arc::new(AtomicUsize::new(0)),
            transcript_snapshot: Arc::new(std::sync::Mutex::new(String::new())),
            command_tx: Mutex::new(None),
            loop_handle: Mutex::new(None),
        }
    }

    /// Start recording.
    ///
    /// Acquires the microphone, initiates the backend handshake, and spawns
    /// the event loop. Returns the receiver for session events. Capture
    /// errors abort the start; the session does not run without audio.
    pub async fn start(&self) -> Result<mpsc::UnboundedReceiver<SessionEvent>> {
        if self.is_recording.load(Ordering::SeqCst) {
            anyhow::bail!("recording already started");
        }

        info!("Starting dictation session: {}", self.config.session_id);

        let mut backend = {
            let mut guard = self.backend.lock().await;
            guard
                .take()
                .context("session already used; create a new session per recording")?
        };

        let audio_rx = match backend.start().await {
            Ok(rx) => rx,
            Err(e) => {
                // The device was never acquired; keep the backend so the
                // caller sees a session that simply did not start.
                *self.backend.lock().await = Some(backend);
                return Err(e).context("Failed to start audio capture");
            }
        };

        let url = build_stream_url(
            &self.config.endpoint,
            &self.config.model,
            self.config.sample_rate,
            self.config.channels,
        )
        .context("Invalid streaming endpoint URL")?;

        let (mut connection, transport_rx) =
            StreamConnection::new(Arc::clone(&self.connector), url);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        self.is_recording.store(true, Ordering::SeqCst);
        self.chunks_captured.store(0, Ordering::SeqCst);
        self.chunks_sent.store(0, Ordering::SeqCst);
        self.transcript_events.store(0, Ordering::SeqCst);
        if let Ok(mut snapshot) = self.transcript_snapshot.lock() {
            snapshot.clear();
        }

        connection.connect(&self.config.credential);
        let _ = events_tx.send(SessionEvent::ConnectionState(ConnectionState::Connecting));

        let now = Instant::now();
        let ctx = LoopCtx {
            backend,
            audio_rx,
            connection,
            transport_rx,
            command_rx,
            events_tx,
            accumulator: TranscriptAccumulator::new(now),
            watchdog: SilenceWatchdog::new(self.config.silence_timeout),
            is_recording: Arc::clone(&self.is_recording),
            chunks_captured: Arc::clone(&self.chunks_captured),
            chunks_sent: Arc::clone(&self.chunks_sent),
            transcript_events: Arc::clone(&self.transcript_events),
            transcript_snapshot: Arc::clone(&self.transcript_snapshot),
        };

        let loop_task = tokio::spawn(run_loop(ctx));

        *self.command_tx.lock().await = Some(command_tx);
        *self.loop_handle.lock().await = Some(loop_task);

        info!("Dictation session started");

        Ok(events_rx)
    }

    /// Stop recording and tear the session down.
    ///
    /// Teardown is ordered and best-effort: the silence timer is cancelled,
    /// capture stops (releasing the device), then the connection closes
    /// gracefully. Idempotent once stopped; returns final statistics.
    pub async fn stop(&self) -> Result<SessionStats> {
        if !self.is_recording.load(Ordering::SeqCst) {
            warn!("Recording not active");
            return Ok(self.stats());
        }

        info!("Stopping dictation session: {}", self.config.session_id);

        let ack_rx = {
            let guard = self.command_tx.lock().await;
            guard.as_ref().and_then(|tx| {
                let (ack_tx, ack_rx) = oneshot::channel();
                tx.send(Command::Stop(ack_tx)).ok().map(|_| ack_rx)
            })
        };

        // An Err here means the loop already tore itself down (auto-stop)
        if let Some(ack) = ack_rx {
            let _ = ack.await;
        }

        {
            let mut handle = self.loop_handle.lock().await;
            if let Some(task) = handle.take() {
                if let Err(e) = task.await {
                    error!("Session loop panicked: {}", e);
                }
            }
        }

        info!("Dictation session stopped");

        Ok(self.stats())
    }

    /// The accumulated transcript (finalized segments only).
    pub fn transcript(&self) -> String {
        self.transcript_snapshot
            .lock()
            .map(|snapshot| snapshot.clone())
            .unwrap_or_default()
    }

    /// Current session statistics.
    pub fn stats(&self) -> SessionStats {
        let duration = Utc::now().signed_duration_since(self.started_at);

        SessionStats {
            is_recording: self.is_recording.load(Ordering::SeqCst),
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            chunks_captured: self.chunks_captured.load(Ordering::SeqCst),
            chunks_sent: self.chunks_sent.load(Ordering::SeqCst),
            transcript_events: self.transcript_events.load(Ordering::SeqCst),
        }
    }
}

/// Everything the event loop owns. Only this task mutates session state.
struct LoopCtx {
    backend: Box<dyn AudioBackend>,
    audio_rx: mpsc::UnboundedReceiver<AudioChunk>,
    connection: StreamConnection,
    transport_rx: mpsc::UnboundedReceiver<TransportEvent>,
    command_rx: mpsc::UnboundedReceiver<Command>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    accumulator: TranscriptAccumulator,
    watchdog: SilenceWatchdog,
    is_recording: Arc<AtomicBool>,
    chunks_captured: Arc<AtomicUsize>,
    chunks_sent: Arc<AtomicUsize>,
    transcript_events: Arc<AtomicUsize>,
    transcript_snapshot: Arc<std::sync::Mutex<String>>,
}

async fn run_loop(mut ctx: LoopCtx) {
    info!("Session event loop started");

    let mut audio_open = true;
    let mut stop_ack: Option<oneshot::Sender<()>> = None;

    loop {
        tokio::select! {
            maybe_chunk = ctx.audio_rx.recv(), if audio_open => {
                match maybe_chunk {
                    Some(chunk) => handle_chunk(&mut ctx, chunk),
                    None => {
                        warn!("Audio channel closed while recording");
                        audio_open = false;
                    }
                }
            }

            Some(event) = ctx.transport_rx.recv() => {
                handle_transport(&mut ctx, event);
            }

            _ = silence_elapsed(ctx.watchdog.deadline()) => {
                let now = Instant::now();
                if ctx.watchdog.try_fire(now) && ctx.accumulator.speech_observed() {
                    info!("Silence timeout reached, auto-stopping session");
                    let _ = ctx.events_tx.send(SessionEvent::AutoStop);
                    break;
                }
            }

            cmd = ctx.command_rx.recv() => {
                match cmd {
                    Some(Command::Stop(ack)) => {
                        stop_ack = Some(ack);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    teardown(&mut ctx).await;
    ctx.is_recording.store(false, Ordering::SeqCst);

    if let Some(ack) = stop_ack {
        let _ = ack.send(());
    }

    info!("Session event loop stopped");
}

fn handle_chunk(ctx: &mut LoopCtx, chunk: AudioChunk) {
    ctx.chunks_captured.fetch_add(1, Ordering::SeqCst);

    match ctx.connection.state() {
        ConnectionState::Connected | ConnectionState::Connecting => {
            ctx.chunks_sent.fetch_add(1, Ordering::SeqCst);
        }
        ConnectionState::Closed | ConnectionState::Error => {
            debug!("Capture continues but transport is down, chunk dropped");
        }
    }

    ctx.connection.send(chunk);
}

fn handle_transport(ctx: &mut LoopCtx, event: TransportEvent) {
    let Some(update) = ctx.connection.handle_event(event) else {
        return;
    };

    match update {
        ConnectionUpdate::StateChanged(state) => {
            let _ = ctx.events_tx.send(SessionEvent::ConnectionState(state));
        }

        ConnectionUpdate::RemoteClosed => {
            let _ = ctx
                .events_tx
                .send(SessionEvent::ConnectionState(ConnectionState::Closed));
            // The session was still expected to be running, so an
            // unsolicited close is surfaced as a transport error
            let _ = ctx.events_tx.send(SessionEvent::Error(
                "transcription stream closed unexpectedly".to_string(),
            ));
        }

        ConnectionUpdate::Failed(message) => {
            let _ = ctx
                .events_tx
                .send(SessionEvent::ConnectionState(ConnectionState::Error));
            let _ = ctx.events_tx.send(SessionEvent::Error(message));
        }

        ConnectionUpdate::Transcript(event) => {
            ctx.transcript_events.fetch_add(1, Ordering::SeqCst);

            let now = Instant::now();
            let changed = ctx.accumulator.apply(&event, now);

            if !event.text.trim().is_empty() {
                ctx.watchdog.observe_speech(now);
            }

            if changed {
                let transcript = ctx.accumulator.transcript().to_string();
                if let Ok(mut snapshot) = ctx.transcript_snapshot.lock() {
                    *snapshot = transcript.clone();
                }
                let _ = ctx.events_tx.send(SessionEvent::TranscriptUpdate(transcript));
            }
        }
    }
}

/// Ordered, best-effort teardown: timer, capture, connection. A failing
/// step never prevents the next one.
async fn teardown(ctx: &mut LoopCtx) {
    ctx.watchdog.cancel();

    if let Err(e) = ctx.backend.stop().await {
        error!("Failed to stop audio capture: {}", e);
    }

    if ctx.connection.disconnect() {
        let _ = ctx
            .events_tx
            .send(SessionEvent::ConnectionState(ConnectionState::Closed));
    }
}

/// Resolves when the armed silence deadline elapses; never resolves while
/// the watchdog is disarmed.
async fn silence_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
