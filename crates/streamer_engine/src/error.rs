use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("playlist_url parameter required")]
    MissingSource,
    #[error("Playlist has {count} items; limit is {limit}.")]
    TooManyTracks { count: usize, limit: usize },
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("could not start enumeration: {0}")]
    Spawn(#[source] io::Error),
    #[error("reading enumeration output failed: {0}")]
    Io(#[from] io::Error),
    #[error("enumeration exited with {status} and returned no items{}", detail_suffix(.detail))]
    Exited {
        status: String,
        detail: Option<String>,
    },
    #[error("No playlist items found.")]
    Empty,
    #[error("enumeration timed out after {}s", .0.as_secs())]
    TimedOut(Duration),
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|detail| format!(": {detail}"))
        .unwrap_or_default()
}

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("output directory {} is unusable: {reason}", .path.display())]
    OutputDir { path: PathBuf, reason: String },
    #[error("could not start downloader: {0}")]
    Spawn(#[source] io::Error),
    #[error("reading downloader output failed: {0}")]
    ReadFailed(#[source] io::Error),
    #[error("downloader terminated unexpectedly ({0})")]
    Crashed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutKind {
    Overall,
    Inactivity,
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Failed to fetch playlist: {0}")]
    Fetch(#[from] FetchError),
    #[error("Missing required binaries: {}", .0.join(", "))]
    ToolMissing(Vec<String>),
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
    #[error("{}", timeout_message(*.kind, *.after))]
    TimedOut { kind: TimeoutKind, after: Duration },
    #[error("Download cancelled")]
    Cancelled,
}

fn timeout_message(kind: TimeoutKind, after: Duration) -> String {
    match kind {
        TimeoutKind::Overall => "Download timed out".to_string(),
        TimeoutKind::Inactivity => format!(
            "No output from downloader for {}s; terminating",
            after.as_secs()
        ),
    }
}

impl JobError {
    /// Stable class label, used in logs and by tests.
    pub fn kind(&self) -> &'static str {
        match self {
            JobError::Validation(_) => "validation",
            JobError::Fetch(_) => "fetch",
            JobError::ToolMissing(_) => "tool_missing",
            JobError::Supervisor(SupervisorError::Crashed(_)) => "process",
            JobError::Supervisor(_) => "supervisor",
            JobError::TimedOut { .. } => "timeout",
            JobError::Cancelled => "cancelled",
        }
    }

    /// The `stream_end` message for a job that ended with this error.
    pub fn end_message(&self) -> &'static str {
        match self {
            JobError::TimedOut { .. } => "timeout",
            JobError::Cancelled => "cancelled",
            _ => "aborted",
        }
    }
}
