use serde::Deserialize;

/// A parsed inbound transcription result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEvent {
    /// Best-alternative transcript text (may be empty)
    pub text: String,
    /// Whether the backend will revise this result further
    pub is_final: bool,
}

/// Control message requesting graceful end-of-stream: the backend flushes
/// any remaining final results before closing.
pub const CLOSE_STREAM: &str = r#"{"type":"CloseStream"}"#;

/// Inbound result message from the transcription backend.
///
/// Only `Results` messages carry transcript text; everything else on the
/// stream (metadata, keepalives) deserializes but yields no event. Fields
/// are lenient because the backend does not guarantee clean framing.
#[derive(Debug, Deserialize)]
struct InboundMessage {
    #[serde(rename = "type")]
    kind: Option<String>,
    channel: Option<InboundChannel>,
    #[serde(default)]
    is_final: bool,
}

#[derive(Debug, Deserialize)]
struct InboundChannel {
    #[serde(default)]
    alternatives: Vec<InboundAlternative>,
}

#[derive(Debug, Deserialize)]
struct InboundAlternative {
    #[serde(default)]
    transcript: String,
}

/// Parses one inbound payload.
///
/// Returns `Ok(None)` for well-formed messages that carry no transcript
/// (unrelated message types, missing channel, no alternatives) and `Err`
/// for payloads that are not valid JSON for the expected shape.
pub fn parse_transcript_event(payload: &str) -> Result<Option<TranscriptEvent>, serde_json::Error> {
    let message: InboundMessage = serde_json::from_str(payload)?;

    if let Some(kind) = &message.kind {
        if kind != "Results" {
            return Ok(None);
        }
    }

    let Some(channel) = message.channel else {
        return Ok(None);
    };

    let Some(alternative) = channel.alternatives.into_iter().next() else {
        return Ok(None);
    };

    Ok(Some(TranscriptEvent {
        text: alternative.transcript,
        is_final: message.is_final,
    }))
}
