use thiserror::Error;

/// Errors raised while acquiring or releasing the microphone.
///
/// Both variants are terminal for the start attempt: the session does not
/// start and no retry is made.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The OS refused access to the input device.
    #[error("microphone permission denied: {0}")]
    PermissionDenied(String),

    /// No usable input device, or the device rejected the stream config.
    #[error("audio input device unavailable: {0}")]
    DeviceUnavailable(String),
}

/// Errors raised by the streaming transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection handshake never completed.
    #[error("handshake with transcription backend failed: {0}")]
    Handshake(String),

    /// The connection broke after it was established.
    #[error("transcription connection failed: {0}")]
    Connection(String),
}
