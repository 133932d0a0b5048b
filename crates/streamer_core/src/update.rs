use std::path::Path;

use crate::{
    is_informational, Event, Msg, ProgressSignal, SequencePosition, TrackBoard, TrackStatus,
    TrackUpdate,
};

/// Pure update function: applies a message to the board and returns the events
/// it produces, in emission order.
pub fn update(mut board: TrackBoard, msg: Msg) -> (TrackBoard, Vec<Event>) {
    let events = match msg {
        Msg::Output(ProgressSignal::ItemStarted { position, .. }) => {
            if board.transition(position, TrackStatus::Downloading) {
                status_update(&board, position, None).into_iter().collect()
            } else {
                Vec::new()
            }
        }
        Msg::Output(ProgressSignal::DownloadProgress { percent }) => {
            apply_progress(&mut board, percent)
        }
        Msg::Output(ProgressSignal::ExtractionComplete { filename }) => {
            apply_extracted(&mut board, filename)
        }
        Msg::Output(ProgressSignal::ErrorLine { raw }) => match board.active() {
            Some(position) => {
                // Best effort: the failure is pinned on whichever track is
                // currently downloading, which may not be the one that failed.
                board.transition(position, TrackStatus::Failed);
                let mut events: Vec<Event> =
                    status_update(&board, position, None).into_iter().collect();
                events.push(Event::error(raw));
                events
            }
            None => vec![Event::error(raw)],
        },
        Msg::Output(ProgressSignal::Unclassified { raw }) => {
            if is_informational(&raw) {
                vec![Event::status(raw)]
            } else {
                Vec::new()
            }
        }
        Msg::OutputEnded => reconcile(&mut board),
    };

    (board, events)
}

/// Leading digits of a path's file name, e.g. `003` in `/dl/003-Song.mp3`.
pub fn sequence_prefix(filename: &str) -> Option<SequencePosition> {
    let name = Path::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(filename);
    let digits: String = name.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

fn apply_progress(board: &mut TrackBoard, percent: Option<f64>) -> Vec<Event> {
    let mut events = Vec::new();
    let position = match board.active() {
        Some(position) => position,
        None => match board.first_queued() {
            Some(position) => {
                board.transition(position, TrackStatus::Downloading);
                events.extend(status_update(board, position, percent));
                if let Some(percent) = percent {
                    board.record_percent(position, whole_percent(percent));
                }
                return events;
            }
            None => return events,
        },
    };

    if let Some(percent) = percent {
        if board.record_percent(position, whole_percent(percent)) {
            events.extend(status_update(board, position, Some(percent)));
        }
    }
    events
}

fn apply_extracted(board: &mut TrackBoard, filename: String) -> Vec<Event> {
    let total = board.total();
    let position = match sequence_prefix(&filename) {
        Some(position) if position >= 1 && (position as usize) <= total => position,
        Some(position) => {
            return vec![Event::error(format!(
                "Finished file {filename} has sequence position {position}, outside 1..={total}"
            ))];
        }
        None => {
            return vec![Event::error(format!(
                "Finished file {filename} has no sequence position prefix"
            ))];
        }
    };

    if !board.transition(position, TrackStatus::Completed) {
        // Already terminal; duplicate or late completion lines are no-ops.
        return Vec::new();
    }

    let counts = board.counts();
    let Some(track) = board.get(position) else {
        return Vec::new();
    };
    let mut update = TrackUpdate::of(track, counts);
    update.filename = Some(filename);
    vec![Event::SongComplete(update), Event::OverallProgress(counts)]
}

fn reconcile(board: &mut TrackBoard) -> Vec<Event> {
    let open = board.open_positions();
    let mut events = Vec::with_capacity(open.len() + 2);
    for &position in &open {
        board.transition(position, TrackStatus::Failed);
        events.extend(status_update(board, position, None));
    }
    if !open.is_empty() {
        events.push(Event::error(format!(
            "{} of {} tracks did not finish downloading",
            open.len(),
            board.total()
        )));
    }
    events.push(Event::OverallProgress(board.counts()));
    events
}

fn status_update(
    board: &TrackBoard,
    position: SequencePosition,
    percent: Option<f64>,
) -> Option<Event> {
    let mut update = TrackUpdate::of(board.get(position)?, board.counts());
    update.percent = percent;
    Some(Event::SongStatusUpdate(update))
}

fn whole_percent(percent: f64) -> u8 {
    percent.clamp(0.0, 100.0).floor() as u8
}
