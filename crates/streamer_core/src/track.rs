use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::ProgressCounts;

/// 1-based ordinal of a track inside its playlist.
pub type SequencePosition = u32;

pub const UNTITLED_TRACK: &str = "Untitled Track";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrackStatus {
    #[default]
    Queued,
    Downloading,
    Completed,
    Failed,
}

impl TrackStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TrackStatus::Completed | TrackStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackDescriptor {
    pub id: String,
    pub title: String,
    pub sequence_position: SequencePosition,
    pub status: TrackStatus,
}

/// Assigns sequence positions in arrival order while a playlist is enumerated.
///
/// Missing ids are synthesized as `item_<n>` (n = tracks accepted so far) and
/// missing or blank titles default to [`UNTITLED_TRACK`]. An id that was
/// already handed out gets a `#<position>` suffix so ids stay unique.
#[derive(Debug, Default)]
pub struct TrackListBuilder {
    tracks: Vec<TrackDescriptor>,
    seen_ids: HashSet<String>,
}

impl TrackListBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: Option<&str>, title: Option<&str>) -> &TrackDescriptor {
        let position = self.tracks.len() as SequencePosition + 1;
        let mut id = match id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => format!("item_{}", self.tracks.len()),
        };
        if self.seen_ids.contains(&id) {
            id = format!("{id}#{position}");
        }
        self.seen_ids.insert(id.clone());

        let title = title
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .unwrap_or(UNTITLED_TRACK)
            .to_string();

        self.tracks.push(TrackDescriptor {
            id,
            title,
            sequence_position: position,
            status: TrackStatus::Queued,
        });
        &self.tracks[self.tracks.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn finish(self) -> Vec<TrackDescriptor> {
        self.tracks
    }
}

/// Per-job track state, keyed by sequence position.
///
/// Only [`crate::update`] mutates a board once the download phase starts.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackBoard {
    tracks: BTreeMap<SequencePosition, TrackDescriptor>,
    completed: usize,
    failed: usize,
    active: Option<SequencePosition>,
    reported_percent: BTreeMap<SequencePosition, u8>,
}

impl TrackBoard {
    /// Builds a board from an enumerated list. Descriptors are normalized to
    /// `Queued`; a repeated sequence position keeps the first descriptor.
    pub fn new(tracks: Vec<TrackDescriptor>) -> Self {
        let mut map = BTreeMap::new();
        for mut track in tracks {
            track.status = TrackStatus::Queued;
            map.entry(track.sequence_position).or_insert(track);
        }
        Self {
            tracks: map,
            ..Self::default()
        }
    }

    pub fn total(&self) -> usize {
        self.tracks.len()
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Tracks that reached a terminal state.
    pub fn processed(&self) -> usize {
        self.completed + self.failed
    }

    pub fn all_terminal(&self) -> bool {
        self.processed() == self.total()
    }

    pub fn get(&self, position: SequencePosition) -> Option<&TrackDescriptor> {
        self.tracks.get(&position)
    }

    pub fn tracks(&self) -> impl Iterator<Item = &TrackDescriptor> {
        self.tracks.values()
    }

    pub fn snapshot(&self) -> Vec<TrackDescriptor> {
        self.tracks.values().cloned().collect()
    }

    pub fn counts(&self) -> ProgressCounts {
        let total = self.total();
        let percentage = if total == 0 {
            0
        } else {
            ((self.completed as f64 / total as f64) * 100.0).round() as u8
        };
        ProgressCounts {
            downloaded_count: self.completed,
            failed_count: self.failed,
            total_count: total,
            percentage,
        }
    }

    /// The track most recently marked `Downloading`, if it still is.
    pub fn active(&self) -> Option<SequencePosition> {
        self.active
            .filter(|pos| self.status_of(*pos) == Some(TrackStatus::Downloading))
    }

    pub(crate) fn first_queued(&self) -> Option<SequencePosition> {
        self.tracks
            .values()
            .find(|track| track.status == TrackStatus::Queued)
            .map(|track| track.sequence_position)
    }

    pub(crate) fn open_positions(&self) -> Vec<SequencePosition> {
        self.tracks
            .values()
            .filter(|track| !track.status.is_terminal())
            .map(|track| track.sequence_position)
            .collect()
    }

    fn status_of(&self, position: SequencePosition) -> Option<TrackStatus> {
        self.tracks.get(&position).map(|track| track.status)
    }

    /// Applies a status transition. Terminal descriptors never change, and
    /// setting the current status again is not a transition; both return false.
    pub(crate) fn transition(&mut self, position: SequencePosition, status: TrackStatus) -> bool {
        let Some(track) = self.tracks.get_mut(&position) else {
            return false;
        };
        if track.status.is_terminal() || track.status == status {
            return false;
        }
        track.status = status;
        match status {
            TrackStatus::Completed => self.completed += 1,
            TrackStatus::Failed => self.failed += 1,
            TrackStatus::Downloading => self.active = Some(position),
            TrackStatus::Queued => {}
        }
        if status.is_terminal() {
            self.reported_percent.remove(&position);
            if self.active == Some(position) {
                self.active = None;
            }
        }
        true
    }

    /// Records a whole percent for a track; returns false when it equals the
    /// last one reported.
    pub(crate) fn record_percent(&mut self, position: SequencePosition, percent: u8) -> bool {
        self.reported_percent.insert(position, percent) != Some(percent)
    }
}
