use tokio::sync::mpsc;

use crate::error::CaptureError;

/// A fixed-interval block of captured microphone audio (16-bit PCM,
/// interleaved).
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

impl AudioChunk {
    /// Encodes the samples as little-endian PCM bytes for the wire.
    pub fn into_pcm_bytes(self) -> Vec<u8> {
        self.samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }
}

/// Configuration for audio capture
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Target sample rate (will convert if the device differs)
    pub sample_rate: u32,
    /// Target channel count (1 = mono)
    pub channels: u16,
    /// Chunk cadence in milliseconds
    pub chunk_interval_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // 16kHz linear PCM for the STT backend
            channels: 1,        // Mono
            chunk_interval_ms: 250,
        }
    }
}

/// Audio capture backend trait
///
/// The production implementation is the cpal microphone backend; tests
/// substitute a scripted backend that feeds chunks from the test body.
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Start capturing audio.
    ///
    /// Returns a channel receiver that will receive audio chunks at the
    /// configured cadence. The sender side never blocks on backpressure:
    /// queueing or dropping is the consumer's concern.
    async fn start(&mut self) -> Result<mpsc::UnboundedReceiver<AudioChunk>, CaptureError>;

    /// Stop capturing and release the input device. Idempotent.
    async fn stop(&mut self) -> Result<(), CaptureError>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Regroups device buffers into exact fixed-interval chunks.
///
/// cpal delivers buffers of whatever size the device favors; the assembler
/// accumulates converted samples and emits one [`AudioChunk`] per complete
/// interval, with a monotonic timestamp derived from the chunk count.
pub struct ChunkAssembler {
    sample_rate: u32,
    channels: u16,
    interval_ms: u64,
    samples_per_chunk: usize,
    buffer: Vec<i16>,
    chunks_emitted: u64,
}

impl ChunkAssembler {
    pub fn new(config: &CaptureConfig) -> Self {
        let samples_per_chunk = (config.sample_rate as u64 * config.chunk_interval_ms / 1000)
            as usize
            * config.channels as usize;

        Self {
            sample_rate: config.sample_rate,
            channels: config.channels,
            interval_ms: config.chunk_interval_ms,
            samples_per_chunk,
            buffer: Vec::with_capacity(samples_per_chunk),
            chunks_emitted: 0,
        }
    }

    /// Feed converted samples; returns every chunk completed by this buffer.
    pub fn push(&mut self, samples: &[i16]) -> Vec<AudioChunk> {
        let mut completed = Vec::new();

        for &sample in samples {
            self.buffer.push(sample);

            if self.buffer.len() >= self.samples_per_chunk {
                let samples = std::mem::replace(
                    &mut self.buffer,
                    Vec::with_capacity(self.samples_per_chunk),
                );

                completed.push(AudioChunk {
                    samples,
                    sample_rate: self.sample_rate,
                    channels: self.channels,
                    timestamp_ms: self.chunks_emitted * self.interval_ms,
                });

                self.chunks_emitted += 1;
            }
        }

        completed
    }
}
