// WebSocket transport for the transcription backend
//
// The connection state machine never touches the socket directly: it talks
// to a Connector that delivers TransportEvents on a channel and hands back
// a TransportLink for outbound frames. Tests substitute an in-memory
// connector; production uses tokio-tungstenite.

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::connect_async;
use tracing::{debug, info, warn};
use url::Url;

use super::messages::CLOSE_STREAM;
use crate::error::TransportError;

/// Frames the session sends toward the backend.
#[derive(Debug)]
pub enum OutboundFrame {
    /// Raw PCM audio bytes
    Audio(Vec<u8>),
    /// Graceful end-of-stream control message
    Finalize,
}

/// Events delivered by the transport to the connection state machine.
#[derive(Debug)]
pub enum TransportEvent {
    /// Handshake succeeded; outbound frames go through the link
    Opened(TransportLink),
    /// One inbound text payload
    Message(String),
    /// The peer closed the stream
    Closed,
    /// Handshake or mid-stream failure
    Failed(TransportError),
}

/// Outbound half of an established connection. Dropping the link ends the
/// writer task, which closes the socket.
#[derive(Debug)]
pub struct TransportLink {
    outbound: mpsc::UnboundedSender<OutboundFrame>,
}

impl TransportLink {
    /// Creates a link and the receiver its writer drains.
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        (Self { outbound }, rx)
    }

    /// Hands a frame to the writer; false if the writer is gone.
    pub fn send(&self, frame: OutboundFrame) -> bool {
        self.outbound.send(frame).is_ok()
    }
}

/// Opens streaming connections to the transcription backend.
///
/// `connect` must not block the caller beyond spawning: the handshake
/// outcome and all subsequent traffic arrive as [`TransportEvent`]s on the
/// provided channel.
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        url: Url,
        credential: String,
        events: mpsc::UnboundedSender<TransportEvent>,
    );
}

/// Builds the streaming endpoint URL for a recognition model and audio
/// format, with interim results enabled.
pub fn build_stream_url(
    base: &str,
    model: &str,
    sample_rate: u32,
    channels: u16,
) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(base)?;

    url.query_pairs_mut()
        .append_pair("model", model)
        .append_pair("encoding", "linear16")
        .append_pair("sample_rate", &sample_rate.to_string())
        .append_pair("channels", &channels.to_string())
        .append_pair("interim_results", "true");

    Ok(url)
}

/// tokio-tungstenite connector
pub struct WsConnector;

#[async_trait::async_trait]
impl Connector for WsConnector {
    async fn connect(
        &self,
        url: Url,
        credential: String,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) {
        info!("Connecting to transcription backend at {}", url.host_str().unwrap_or("?"));

        let request = match build_request(&url, &credential) {
            Ok(request) => request,
            Err(e) => {
                let _ = events.send(TransportEvent::Failed(e));
                return;
            }
        };

        let ws_stream = match connect_async(request).await {
            Ok((ws_stream, _response)) => ws_stream,
            Err(e) => {
                let _ = events.send(TransportEvent::Failed(TransportError::Handshake(
                    e.to_string(),
                )));
                return;
            }
        };

        info!("Transcription stream established");

        let (mut write, mut read) = ws_stream.split();
        let (link, mut outbound_rx) = TransportLink::pair();

        if events.send(TransportEvent::Opened(link)).is_err() {
            return;
        }

        // Writer: drains outbound frames until the link is dropped, then
        // closes the socket.
        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                let message = match frame {
                    OutboundFrame::Audio(pcm) => Message::Binary(pcm),
                    OutboundFrame::Finalize => Message::Text(CLOSE_STREAM.to_string()),
                };

                if let Err(e) = write.send(message).await {
                    debug!("Outbound frame dropped, socket is gone: {}", e);
                    break;
                }
            }

            let _ = write.close().await;
        });

        // Reader: runs on the connector task until the peer closes or the
        // stream errors.
        while let Some(result) = read.next().await {
            match result {
                Ok(Message::Text(payload)) => {
                    if events.send(TransportEvent::Message(payload)).is_err() {
                        return;
                    }
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {} // binary/ping/pong frames carry no transcripts
                Err(e) => {
                    warn!("Transcription stream failed: {}", e);
                    let _ = events.send(TransportEvent::Failed(TransportError::Connection(
                        e.to_string(),
                    )));
                    return;
                }
            }
        }

        let _ = events.send(TransportEvent::Closed);
    }
}

fn build_request(
    url: &Url,
    credential: &str,
) -> Result<tokio_tungstenite::tungstenite::handshake::client::Request, TransportError> {
    let mut request = url
        .as_str()
        .into_client_request()
        .map_err(|e| TransportError::Handshake(e.to_string()))?;

    let header = format!("Token {}", credential)
        .parse()
        .map_err(|_| TransportError::Handshake("credential is not a valid header value".to_string()))?;
    request.headers_mut().insert(AUTHORIZATION, header);

    Ok(request)
}
