use std::path::PathBuf;
use std::time::Duration;

/// How to launch an external tool: a program plus arguments placed before the
/// job-specific ones. `program: None` means "look it up on PATH".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: Option<PathBuf>,
    pub leading_args: Vec<String>,
}

impl ToolCommand {
    pub fn at(program: impl Into<PathBuf>) -> Self {
        Self {
            program: Some(program.into()),
            leading_args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// The media extractor (`yt-dlp`), used for both enumeration and download.
    pub extractor: ToolCommand,
    /// Post-processor needed for audio extraction; missing is only a warning.
    pub ffmpeg: ToolCommand,
    pub max_tracks: usize,
    pub fetch_socket_timeout: Duration,
    pub fetch_timeout: Duration,
    pub audio_format: String,
    pub audio_quality: String,
    pub download_socket_timeout: Duration,
    pub retries: u32,
    pub heartbeat_interval: Duration,
    pub download_timeout: Duration,
    /// `None` disables the inactivity check.
    pub activity_timeout: Option<Duration>,
    /// Time between the graceful termination signal and the forced kill.
    pub kill_grace: Duration,
    /// How long to wait for the extractor to exit once its output has ended.
    pub exit_wait: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            extractor: ToolCommand::default(),
            ffmpeg: ToolCommand::default(),
            max_tracks: 40,
            fetch_socket_timeout: Duration::from_secs(30),
            fetch_timeout: Duration::from_secs(120),
            audio_format: "mp3".to_string(),
            audio_quality: "0".to_string(),
            download_socket_timeout: Duration::from_secs(30),
            retries: 3,
            heartbeat_interval: Duration::from_secs(15),
            download_timeout: Duration::from_secs(60 * 60),
            activity_timeout: Some(Duration::from_secs(300)),
            kill_grace: Duration::from_millis(500),
            exit_wait: Duration::from_secs(3),
        }
    }
}
