// Microphone capture backend using cpal
//
// The cpal stream is not Send, so it lives on a dedicated capture thread:
// the thread builds the device and stream, reports readiness, then blocks
// until it is told to stop. Dropping the stream releases the hardware.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use std::thread;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use super::backend::{AudioBackend, AudioChunk, CaptureConfig, ChunkAssembler};
use crate::error::CaptureError;

/// cpal-based microphone backend
pub struct MicrophoneBackend {
    config: CaptureConfig,
    worker: Option<CaptureWorker>,
}

/// Handle to the running capture thread
struct CaptureWorker {
    stop_tx: std::sync::mpsc::Sender<()>,
    thread: thread::JoinHandle<()>,
}

impl MicrophoneBackend {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            worker: None,
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for MicrophoneBackend {
    async fn start(&mut self) -> Result<mpsc::UnboundedReceiver<AudioChunk>, CaptureError> {
        if self.worker.is_some() {
            return Err(CaptureError::DeviceUnavailable(
                "microphone is already captured by this session".to_string(),
            ));
        }

        info!(
            "Starting microphone capture ({}Hz, {} channels, {}ms chunks)",
            self.config.sample_rate, self.config.channels, self.config.chunk_interval_ms
        );

        let (chunk_tx, chunk_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = std::sync::mpsc::channel();

        let config = self.config.clone();
        let thread = thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || capture_thread(config, chunk_tx, ready_tx, stop_rx))
            .map_err(|e| {
                CaptureError::DeviceUnavailable(format!("failed to spawn capture thread: {}", e))
            })?;

        match ready_rx.await {
            Ok(Ok(())) => {
                self.worker = Some(CaptureWorker { stop_tx, thread });
                info!("Microphone capture started");
                Ok(chunk_rx)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(CaptureError::DeviceUnavailable(
                "capture thread exited before reporting readiness".to_string(),
            )),
        }
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };

        info!("Stopping microphone capture");

        // Wake the capture thread; an Err means it already exited
        let _ = worker.stop_tx.send(());

        let joined = tokio::task::spawn_blocking(move || worker.thread.join()).await;
        if !matches!(joined, Ok(Ok(()))) {
            warn!("Capture thread did not shut down cleanly");
        }

        info!("Microphone released");
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.worker.is_some()
    }

    fn name(&self) -> &str {
        "microphone (cpal)"
    }
}

/// Body of the dedicated capture thread: owns the cpal stream for its whole
/// lifetime and parks on the stop channel while audio flows via callbacks.
fn capture_thread(
    config: CaptureConfig,
    chunk_tx: mpsc::UnboundedSender<AudioChunk>,
    ready_tx: oneshot::Sender<Result<(), CaptureError>>,
    stop_rx: std::sync::mpsc::Receiver<()>,
) {
    let stream = match build_input_stream(&config, chunk_tx) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(map_stream_error(e.to_string())));
        return;
    }

    if ready_tx.send(Ok(())).is_err() {
        return;
    }

    // Block until stop() signals or the backend is dropped
    let _ = stop_rx.recv();

    drop(stream);
}

fn build_input_stream(
    config: &CaptureConfig,
    chunk_tx: mpsc::UnboundedSender<AudioChunk>,
) -> Result<cpal::Stream, CaptureError> {
    let host = cpal::default_host();
    let device = host.default_input_device().ok_or_else(|| {
        CaptureError::DeviceUnavailable("no default input device found".to_string())
    })?;

    let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
    info!("Using input device: {}", device_name);

    let sample_format = device
        .default_input_config()
        .map_err(|e| map_stream_error(e.to_string()))?
        .sample_format();

    let stream_config = StreamConfig {
        channels: config.channels,
        sample_rate: cpal::SampleRate(config.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let mut assembler = ChunkAssembler::new(config);
    let error_fn = |e: cpal::StreamError| warn!("Audio stream error: {}", e);

    let stream = match sample_format {
        SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _| {
                for chunk in assembler.push(data) {
                    let _ = chunk_tx.send(chunk);
                }
            },
            error_fn,
            None,
        ),
        SampleFormat::U16 => device.build_input_stream(
            &stream_config,
            move |data: &[u16], _| {
                let converted: Vec<i16> =
                    data.iter().map(|&s| (s as i32 - 32768) as i16).collect();
                for chunk in assembler.push(&converted) {
                    let _ = chunk_tx.send(chunk);
                }
            },
            error_fn,
            None,
        ),
        _ => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _| {
                let converted: Vec<i16> = data
                    .iter()
                    .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                    .collect();
                for chunk in assembler.push(&converted) {
                    let _ = chunk_tx.send(chunk);
                }
            },
            error_fn,
            None,
        ),
    };

    stream.map_err(|e| match e {
        cpal::BuildStreamError::DeviceNotAvailable => {
            CaptureError::DeviceUnavailable("input device disappeared".to_string())
        }
        other => map_stream_error(other.to_string()),
    })
}

/// Classifies an opaque backend error message into the capture taxonomy.
/// cpal reports OS permission refusals as backend-specific errors, so the
/// message text is the only signal available.
fn map_stream_error(message: String) -> CaptureError {
    let lowered = message.to_lowercase();
    if lowered.contains("permission") || lowered.contains("denied") {
        CaptureError::PermissionDenied(message)
    } else {
        CaptureError::DeviceUnavailable(message)
    }
}
