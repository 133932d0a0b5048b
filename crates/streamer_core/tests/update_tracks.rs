use std::sync::Once;

use pretty_assertions::assert_eq;
use streamer_core::{
    classify_line, update, Event, Msg, ProgressSignal, TrackBoard, TrackDescriptor,
    TrackListBuilder, TrackStatus,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

fn board_with(count: usize) -> TrackBoard {
    let mut builder = TrackListBuilder::new();
    for n in 1..=count {
        builder.push(Some(&format!("vid{n}")), Some(&format!("Song {n}")));
    }
    TrackBoard::new(builder.finish())
}

fn feed(board: TrackBoard, line: &str) -> (TrackBoard, Vec<Event>) {
    update(board, Msg::Output(classify_line(line)))
}

fn status_of(board: &TrackBoard, position: u32) -> TrackStatus {
    board.get(position).unwrap().status
}

fn names(events: &[Event]) -> Vec<&'static str> {
    events.iter().map(Event::name).collect()
}

#[test]
fn builder_assigns_contiguous_positions_and_defaults() {
    init_logging();
    let mut builder = TrackListBuilder::new();
    builder.push(Some("a"), Some("First"));
    builder.push(None, None);
    builder.push(Some("  "), Some("   "));
    builder.push(Some("a"), Some("Again"));
    let tracks = builder.finish();

    let positions: Vec<_> = tracks.iter().map(|t| t.sequence_position).collect();
    assert_eq!(positions, vec![1, 2, 3, 4]);

    let ids: Vec<_> = tracks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "item_1", "item_2", "a#4"]);
    assert_eq!(tracks[1].title, "Untitled Track");
    assert_eq!(tracks[2].title, "Untitled Track");
    assert!(tracks.iter().all(|t| t.status == TrackStatus::Queued));
}

#[test]
fn progress_then_extraction_completes_track_once() {
    init_logging();
    let board = board_with(3);

    let (board, events) = feed(board, "[download]  10.0% of 3.00MiB at 1.00MiB/s ETA 00:02");
    assert_eq!(names(&events), vec!["song_status_update"]);
    assert_eq!(status_of(&board, 1), TrackStatus::Downloading);

    let (board, events) = feed(board, "[ExtractAudio] Destination: /dl/p/001-Song 1.mp3");
    assert_eq!(names(&events), vec!["song_complete", "overall_progress"]);
    assert_eq!(status_of(&board, 1), TrackStatus::Completed);
    match &events[1] {
        Event::OverallProgress(counts) => {
            assert_eq!(counts.downloaded_count, 1);
            assert_eq!(counts.total_count, 3);
            assert_eq!(counts.percentage, 33);
        }
        other => panic!("unexpected event {other:?}"),
    }
    match &events[0] {
        Event::SongComplete(update) => {
            assert_eq!(update.id, "vid1");
            assert_eq!(update.filename.as_deref(), Some("/dl/p/001-Song 1.mp3"));
        }
        other => panic!("unexpected event {other:?}"),
    }

    // Duplicate completion is a no-op.
    let (board, events) = feed(board, "[ExtractAudio] Destination: /dl/p/001-Song 1.mp3");
    assert!(events.is_empty());
    assert_eq!(board.completed(), 1);
}

#[test]
fn out_of_order_completions_are_keyed_by_position() {
    init_logging();
    let board = board_with(3);
    let (board, _) = feed(board, "[ExtractAudio] Destination: 003-c.mp3");
    let (board, _) = feed(board, "[ExtractAudio] Destination: 001-a.mp3");

    assert_eq!(status_of(&board, 1), TrackStatus::Completed);
    assert_eq!(status_of(&board, 2), TrackStatus::Queued);
    assert_eq!(status_of(&board, 3), TrackStatus::Completed);
    assert_eq!(board.counts().percentage, 67);
}

#[test]
fn out_of_range_position_yields_one_error_and_no_change() {
    init_logging();
    let board = board_with(2);
    let before = board.clone();

    let (board, events) = feed(board, "[ExtractAudio] Destination: /dl/009-ghost.mp3");
    assert_eq!(names(&events), vec!["error"]);
    assert_eq!(board, before);

    let (board, events) = feed(board, "[ExtractAudio] Destination: /dl/ghost.mp3");
    assert_eq!(names(&events), vec!["error"]);
    assert_eq!(board, before);
}

#[test]
fn progress_reports_only_whole_percent_changes() {
    init_logging();
    let board = board_with(1);
    let (board, events) = feed(board, "[download]   1.0% of 1MiB");
    assert_eq!(events.len(), 1);
    let (board, events) = feed(board, "[download]   1.5% of 1MiB");
    assert!(events.is_empty());
    let (_board, events) = feed(board, "[download]   2.1% of 1MiB");
    match events.as_slice() {
        [Event::SongStatusUpdate(update)] => {
            assert_eq!(update.percent, Some(2.1));
            assert_eq!(update.status, TrackStatus::Downloading);
        }
        other => panic!("unexpected events {other:?}"),
    }
}

#[test]
fn item_started_marks_track_downloading_once() {
    init_logging();
    let board = board_with(3);
    let (board, events) = feed(board, "[download] Downloading item 2 of 3");
    assert_eq!(names(&events), vec!["song_status_update"]);
    assert_eq!(status_of(&board, 2), TrackStatus::Downloading);
    assert_eq!(board.active(), Some(2));

    let (board, events) = feed(board, "[download] Downloading item 2 of 3");
    assert!(events.is_empty());

    let (board, events) = feed(board, "[download] Downloading item 7 of 3");
    assert!(events.is_empty());
    assert_eq!(board.active(), Some(2));
}

#[test]
fn error_line_fails_the_active_track() {
    init_logging();
    let board = board_with(2);
    let (board, _) = feed(board, "[download] Downloading item 1 of 2");
    let (board, events) = feed(board, "ERROR: [youtube] vid1: Video unavailable");

    assert_eq!(names(&events), vec!["song_status_update", "error"]);
    assert_eq!(status_of(&board, 1), TrackStatus::Failed);
    assert_eq!(board.failed(), 1);
    assert_eq!(board.active(), None);

    // A later completion for the failed track does not resurrect it.
    let (board, events) = feed(board, "[ExtractAudio] Destination: 001-vid1.mp3");
    assert!(events.is_empty());
    assert_eq!(status_of(&board, 1), TrackStatus::Failed);
}

#[test]
fn error_line_without_active_track_changes_nothing() {
    init_logging();
    let board = board_with(2);
    let before = board.clone();
    let (board, events) = feed(board, "ERROR: unable to resolve host");
    assert_eq!(
        events,
        vec![Event::Error {
            message: "ERROR: unable to resolve host".to_string()
        }]
    );
    assert_eq!(board, before);
}

#[test]
fn noise_is_dropped_and_informational_lines_forwarded() {
    init_logging();
    let board = board_with(1);
    let (board, events) = feed(board, "[youtube] vid1: Downloading webpage");
    assert!(events.is_empty());
    let (_board, events) = feed(board, "Deleting original file 001-a.webm (pass -k to keep)");
    assert_eq!(
        events,
        vec![Event::status("Deleting original file 001-a.webm (pass -k to keep)")]
    );
}

#[test]
fn output_end_forces_open_tracks_to_failed() {
    init_logging();
    let mut board = board_with(5);
    for line in [
        "[ExtractAudio] Destination: 001-a.mp3",
        "[download] Downloading item 2 of 5",
        "[ExtractAudio] Destination: 002-b.mp3",
        "[download] Downloading item 3 of 5",
        "[download]  40.0% of 1MiB",
    ] {
        board = feed(board, line).0;
    }
    assert_eq!(board.processed(), 2);

    let (board, events) = update(board, Msg::OutputEnded);
    let failed: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            Event::SongStatusUpdate(update) if update.status == TrackStatus::Failed => {
                Some(update.sequence_position)
            }
            _ => None,
        })
        .collect();
    assert_eq!(failed, vec![3, 4, 5]);
    assert_eq!(
        &names(&events)[3..],
        &["error", "overall_progress"]
    );
    assert!(board.all_terminal());
    assert_eq!(board.completed(), 2);
    assert_eq!(board.failed(), 3);
}

#[test]
fn processed_count_never_decreases() {
    init_logging();
    let lines = [
        "[download] Downloading item 1 of 3",
        "[download]  50.0% of 1MiB",
        "ERROR: boom",
        "[ExtractAudio] Destination: 001-a.mp3",
        "[download] Downloading item 2 of 3",
        "[ExtractAudio] Destination: 002-b.mp3",
        "[ExtractAudio] Destination: 002-b.mp3",
        "[ExtractAudio] Destination: 042-z.mp3",
    ];
    let mut board = board_with(3);
    let mut last = 0;
    for line in lines {
        board = feed(board, line).0;
        assert!(board.processed() >= last);
        last = board.processed();
    }
    let (board, _) = update(board, Msg::OutputEnded);
    assert_eq!(board.processed(), board.total());

    // Reconciling twice emits no further track updates.
    let (_board, events) = update(board, Msg::OutputEnded);
    assert_eq!(names(&events), vec!["overall_progress"]);
}

#[test]
fn board_normalizes_statuses_and_keeps_first_position() {
    init_logging();
    let tracks = vec![
        TrackDescriptor {
            id: "x".into(),
            title: "X".into(),
            sequence_position: 1,
            status: TrackStatus::Completed,
        },
        TrackDescriptor {
            id: "y".into(),
            title: "Y".into(),
            sequence_position: 1,
            status: TrackStatus::Queued,
        },
    ];
    let board = TrackBoard::new(tracks);
    assert_eq!(board.total(), 1);
    assert_eq!(board.get(1).unwrap().id, "x");
    assert_eq!(board.get(1).unwrap().status, TrackStatus::Queued);
    assert_eq!(board.completed(), 0);
}

#[test]
fn empty_board_reports_zero_percent() {
    let board = TrackBoard::new(Vec::new());
    assert_eq!(board.counts().percentage, 0);
    let (_board, events) = update(
        board,
        Msg::Output(ProgressSignal::DownloadProgress { percent: Some(5.0) }),
    );
    assert!(events.is_empty());
}
