use anyhow::Result;
use clap::Parser;
use std::time::Duration;
use tracing::{info, warn};
use voicepane::{Config, DictationSession, SessionConfig, SessionEvent};

/// Stream microphone audio to the transcription backend and print the
/// live transcript. Stops on Ctrl-C or after the silence timeout.
#[derive(Debug, Parser)]
#[command(name = "voicepane", version)]
struct Cli {
    /// Config file (extension resolved by the loader)
    #[arg(long, default_value = "config/voicepane")]
    config: String,

    /// Override the backend credential from the config file
    #[arg(long)]
    credential: Option<String>,

    /// Override the silence timeout in seconds (0 disables auto-stop)
    #[arg(long)]
    silence_timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    let session_config = SessionConfig {
        endpoint: cfg.stream.endpoint,
        model: cfg.stream.model,
        credential: cli.credential.unwrap_or(cfg.stream.credential),
        silence_timeout: Duration::from_secs(
            cli.silence_timeout
                .unwrap_or(cfg.session.silence_timeout_secs),
        ),
        sample_rate: cfg.audio.sample_rate,
        channels: cfg.audio.channels,
        chunk_interval_ms: cfg.audio.chunk_interval_ms,
        ..SessionConfig::default()
    };

    info!("voicepane v{}", env!("CARGO_PKG_VERSION"));
    info!("Session: {}", session_config.session_id);

    let session = DictationSession::new(session_config);
    let mut events = session.start().await?;

    loop {
        tokio::select! {
            maybe_event = events.recv() => {
                match maybe_event {
                    Some(SessionEvent::TranscriptUpdate(transcript)) => {
                        println!("{}", transcript);
                    }
                    Some(SessionEvent::ConnectionState(state)) => {
                        info!("Connection state: {:?}", state);
                    }
                    Some(SessionEvent::Error(message)) => {
                        warn!("{}", message);
                    }
                    Some(SessionEvent::AutoStop) => {
                        info!("Silence detected, stopping");
                        break;
                    }
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping");
                break;
            }
        }
    }

    let stats = session.stop().await?;
    let transcript = session.transcript();

    if transcript.is_empty() {
        info!("No speech transcribed");
    } else {
        println!("{}", transcript);
    }

    info!(
        "Session finished: {:.1}s, {} chunks captured, {} sent, {} transcript events",
        stats.duration_secs, stats.chunks_captured, stats.chunks_sent, stats.transcript_events
    );

    Ok(())
}
