use serde::Serialize;

use crate::{SequencePosition, TrackDescriptor, TrackStatus};

/// Running totals carried by progress events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressCounts {
    pub downloaded_count: usize,
    pub failed_count: usize,
    pub total_count: usize,
    /// `round(downloaded_count / total_count * 100)`.
    pub percentage: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackUpdate {
    pub id: String,
    pub title: String,
    pub sequence_position: SequencePosition,
    pub status: TrackStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub counts: ProgressCounts,
}

impl TrackUpdate {
    pub(crate) fn of(track: &TrackDescriptor, counts: ProgressCounts) -> Self {
        Self {
            id: track.id.clone(),
            title: track.title.clone(),
            sequence_position: track.sequence_position,
            status: track.status,
            percent: None,
            filename: None,
            counts,
        }
    }
}

/// One message of the outbound stream. The serialized form of each variant is
/// its payload; the wire label comes from [`Event::name`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Event {
    Status { message: String },
    InitialSongList { songs: Vec<TrackDescriptor> },
    SongStatusUpdate(TrackUpdate),
    SongComplete(TrackUpdate),
    OverallProgress(ProgressCounts),
    Heartbeat { ts: i64 },
    Error { message: String },
    StreamEnd { message: String },
}

impl Event {
    pub fn status(message: impl Into<String>) -> Self {
        Event::Status {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Event::Error {
            message: message.into(),
        }
    }

    pub fn stream_end(message: impl Into<String>) -> Self {
        Event::StreamEnd {
            message: message.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Event::Status { .. } => "status",
            Event::InitialSongList { .. } => "initial_song_list",
            Event::SongStatusUpdate(_) => "song_status_update",
            Event::SongComplete(_) => "song_complete",
            Event::OverallProgress(_) => "overall_progress",
            Event::Heartbeat { .. } => "heartbeat",
            Event::Error { .. } => "error",
            Event::StreamEnd { .. } => "stream_end",
        }
    }

    pub fn is_stream_end(&self) -> bool {
        matches!(self, Event::StreamEnd { .. })
    }
}
