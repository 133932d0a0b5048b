use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use engine_logging::LogDestination;
use serde::Deserialize;
use streamer_engine::{EngineConfig, ToolCommand};

pub const CONFIG_ENV: &str = "STREAMER_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "./streamer.ron";

/// Server settings as read from the RON file. Every field may be omitted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub bind: SocketAddr,
    pub downloads_dir: PathBuf,
    pub log_destination: LogDestination,
    pub log_level: String,
    pub log_file: PathBuf,
    pub extractor_path: Option<PathBuf>,
    pub ffmpeg_path: Option<PathBuf>,
    pub max_tracks: usize,
    pub audio_format: String,
    pub audio_quality: String,
    pub retries: u32,
    pub fetch_timeout_secs: u64,
    pub socket_timeout_secs: u64,
    pub heartbeat_secs: u64,
    /// At least one second.
    pub download_timeout_secs: u64,
    /// Zero disables the inactivity timeout.
    pub inactivity_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 5000)),
            downloads_dir: PathBuf::from("./downloads"),
            log_destination: LogDestination::default(),
            log_level: "info".to_string(),
            log_file: PathBuf::from(engine_logging::DEFAULT_LOG_FILE),
            extractor_path: None,
            ffmpeg_path: None,
            max_tracks: engine.max_tracks,
            audio_format: engine.audio_format,
            audio_quality: engine.audio_quality,
            retries: engine.retries,
            fetch_timeout_secs: engine.fetch_timeout.as_secs(),
            socket_timeout_secs: engine.download_socket_timeout.as_secs(),
            heartbeat_secs: engine.heartbeat_interval.as_secs(),
            download_timeout_secs: engine.download_timeout.as_secs(),
            inactivity_timeout_secs: engine
                .activity_timeout
                .map(|limit| limit.as_secs())
                .unwrap_or(0),
        }
    }
}

impl Settings {
    /// Reads the file named by `STREAMER_CONFIG`, else `./streamer.ron` if it
    /// exists, else the defaults.
    pub fn load() -> anyhow::Result<Self> {
        match env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path)),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        Self::from_ron(&text).with_context(|| format!("parsing settings in {}", path.display()))
    }

    pub fn from_ron(text: &str) -> anyhow::Result<Self> {
        Ok(ron::from_str(text)?)
    }

    pub fn engine_config(&self) -> EngineConfig {
        let defaults = EngineConfig::default();
        EngineConfig {
            extractor: tool(self.extractor_path.as_deref()),
            ffmpeg: tool(self.ffmpeg_path.as_deref()),
            max_tracks: self.max_tracks,
            fetch_socket_timeout: Duration::from_secs(self.socket_timeout_secs),
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            audio_format: self.audio_format.clone(),
            audio_quality: self.audio_quality.clone(),
            download_socket_timeout: Duration::from_secs(self.socket_timeout_secs),
            retries: self.retries,
            heartbeat_interval: Duration::from_secs(self.heartbeat_secs.max(1)),
            download_timeout: Duration::from_secs(self.download_timeout_secs.max(1)),
            activity_timeout: (self.inactivity_timeout_secs > 0)
                .then(|| Duration::from_secs(self.inactivity_timeout_secs)),
            ..defaults
        }
    }
}

fn tool(path: Option<&Path>) -> ToolCommand {
    path.map(ToolCommand::at).unwrap_or_default()
}
