//! Streamer core: track state, output-line correlation and the event wire format.
mod event;
mod msg;
mod signal;
mod track;
mod update;
mod wire;

pub use event::{Event, ProgressCounts, TrackUpdate};
pub use msg::Msg;
pub use signal::{classify_line, is_informational, LineClassifier, ProgressSignal};
pub use track::{
    SequencePosition, TrackBoard, TrackDescriptor, TrackListBuilder, TrackStatus, UNTITLED_TRACK,
};
pub use update::{sequence_prefix, update};
pub use wire::{encode, encode_frame};
