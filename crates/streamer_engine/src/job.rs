use std::path::PathBuf;

use engine_logging::{engine_error, engine_info, engine_warn};
use streamer_core::{update, Event, Msg, TrackBoard};
use tokio_util::sync::CancellationToken;

use crate::fetch::{ExtractorFetcher, FetchSettings, PlaylistFetcher};
use crate::supervisor::DownloadSupervisor;
use crate::tools::resolve_toolchain;
use crate::{EngineConfig, EventSink, JobError, ValidationError};

/// One playlist download request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub source: Option<String>,
    pub target_dir: PathBuf,
}

/// Summary of a finished job, for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    /// Class of the error that ended the job early, if any.
    pub error_kind: Option<&'static str>,
    pub end_message: &'static str,
}

/// Runs a job end to end. Always emits exactly one `stream_end`, as the last
/// event, whatever happens along the way.
pub async fn run_job(
    config: &EngineConfig,
    request: &JobRequest,
    sink: &dyn EventSink,
    cancel: &CancellationToken,
) -> JobReport {
    let report = match prepare_and_download(config, request, sink, cancel).await {
        Err(err) => {
            engine_warn!("Job aborted before download ({}): {}", err.kind(), err);
            sink.emit(Event::error(err.to_string()));
            JobReport {
                total: 0,
                completed: 0,
                failed: 0,
                error_kind: Some(err.kind()),
                end_message: err.end_message(),
            }
        }
        Ok((board, phase_error)) => finish(board, phase_error, sink),
    };
    sink.emit(Event::stream_end(report.end_message));
    report
}

async fn prepare_and_download(
    config: &EngineConfig,
    request: &JobRequest,
    sink: &dyn EventSink,
    cancel: &CancellationToken,
) -> Result<(TrackBoard, Option<JobError>), JobError> {
    let source = validate_source(request.source.as_deref())?;
    let toolchain = resolve_toolchain(config)?;

    sink.emit(Event::status("Fetching playlist details..."));
    let fetcher = ExtractorFetcher::new(toolchain.extractor.clone(), FetchSettings::from(config));
    let tracks = fetcher.fetch(&source, cancel).await?;

    let total = tracks.len();
    sink.emit(Event::InitialSongList {
        songs: tracks.clone(),
    });
    sink.emit(Event::status(format!("Starting download of {total} items...")));

    let supervisor = DownloadSupervisor::new(&toolchain, config);
    let board = TrackBoard::new(tracks);
    Ok(supervisor
        .run(&source, &request.target_dir, board, sink, cancel)
        .await)
}

fn finish(board: TrackBoard, phase_error: Option<JobError>, sink: &dyn EventSink) -> JobReport {
    if let Some(err) = &phase_error {
        engine_error!("Download phase ended early ({}): {}", err.kind(), err);
        sink.emit(Event::error(err.to_string()));
    }

    let (board, events) = update(board, Msg::OutputEnded);
    for event in events {
        sink.emit(event);
    }
    if phase_error.is_none() {
        sink.emit(Event::status("Download finished."));
    }

    engine_info!(
        "Job finished: {} completed, {} failed of {}",
        board.completed(),
        board.failed(),
        board.total()
    );
    JobReport {
        total: board.total(),
        completed: board.completed(),
        failed: board.failed(),
        error_kind: phase_error.as_ref().map(JobError::kind),
        end_message: phase_error
            .as_ref()
            .map(JobError::end_message)
            .unwrap_or("done"),
    }
}

/// Trims the source reference. Anything non-empty is handed to the extractor
/// after an end-of-options marker, so it is never read as a flag.
pub fn validate_source(source: Option<&str>) -> Result<String, ValidationError> {
    source
        .map(str::trim)
        .filter(|source| !source.is_empty())
        .map(str::to_string)
        .ok_or(ValidationError::MissingSource)
}
