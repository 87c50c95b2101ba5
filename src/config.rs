use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub stream: StreamConfig,
    pub audio: AudioConfig,
    pub session: SessionTimeouts,
}

#[derive(Debug, Deserialize)]
pub struct StreamConfig {
    pub endpoint: String,
    pub model: String,
    pub credential: String,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub chunk_interval_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct SessionTimeouts {
    /// Quiet seconds before auto-stop; 0 disables the watchdog
    pub silence_timeout_secs: u64,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
