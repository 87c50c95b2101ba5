pub mod backend;
pub mod mic;

pub use backend::{AudioBackend, AudioChunk, CaptureConfig, ChunkAssembler};
pub use mic::MicrophoneBackend;
