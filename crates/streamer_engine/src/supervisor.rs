use std::io;
use std::path::Path;
use std::process::ExitStatus;

use engine_logging::{engine_info, engine_trace, engine_warn};
use streamer_core::{update, Event, LineClassifier, Msg, TrackBoard};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::lifecycle::{Alarm, Watchdog};
use crate::persist::ensure_output_dir;
use crate::process::ProcessGuard;
use crate::tools::{ResolvedTool, Toolchain};
use crate::{EngineConfig, EventSink, JobError, SupervisorError, TimeoutKind};

/// Output template; the leading sequence position is how finished files are
/// matched back to tracks.
pub const OUTPUT_TEMPLATE: &str = "%(playlist_index)03d-%(title)s.%(ext)s";

enum Stop {
    Eof,
    Cancelled,
    TimedOut(TimeoutKind),
    ReadFailed(io::Error),
}

/// Runs the bulk extraction for one job and feeds its output through the
/// correlation update.
pub struct DownloadSupervisor<'a> {
    tool: &'a ResolvedTool,
    ffmpeg: Option<&'a ResolvedTool>,
    config: &'a EngineConfig,
}

impl<'a> DownloadSupervisor<'a> {
    pub fn new(toolchain: &'a Toolchain, config: &'a EngineConfig) -> Self {
        Self {
            tool: &toolchain.extractor,
            ffmpeg: toolchain.ffmpeg.as_ref(),
            config,
        }
    }

    pub fn command(&self, source: &str, target_dir: &Path) -> tokio::process::Command {
        let config = self.config;
        let mut cmd = self.tool.command();
        cmd.arg("-x")
            .args(["--audio-format", config.audio_format.as_str()])
            .args(["--audio-quality", config.audio_quality.as_str()])
            .arg("-o")
            .arg(target_dir.join(OUTPUT_TEMPLATE))
            .args(["--yes-playlist", "--ignore-errors", "--socket-timeout"])
            .arg(config.download_socket_timeout.as_secs().max(1).to_string())
            .arg("--retries")
            .arg(config.retries.to_string())
            .args(["--no-warnings", "--newline"]);
        // Only an explicitly configured ffmpeg is passed on; otherwise the
        // extractor finds its own on PATH.
        if let (Some(ffmpeg), Some(_)) = (self.ffmpeg, &config.ffmpeg.program) {
            cmd.arg("--ffmpeg-location").arg(&ffmpeg.program);
        }
        cmd.arg("--").arg(source);
        cmd
    }

    /// Drives the download phase. Returns the board (not yet reconciled) and the
    /// error that cut the phase short, if any. The subprocess is gone by the
    /// time this returns.
    pub async fn run(
        &self,
        source: &str,
        target_dir: &Path,
        mut board: TrackBoard,
        sink: &dyn EventSink,
        cancel: &CancellationToken,
    ) -> (TrackBoard, Option<JobError>) {
        if let Err(err) = ensure_output_dir(target_dir) {
            return (board, Some(err.into()));
        }

        let cmd = self.command(source, target_dir);
        engine_info!("Starting download: {:?}", cmd.as_std());
        let (mut guard, mut lines) = match ProcessGuard::spawn(cmd, "downloader") {
            Ok(spawned) => spawned,
            Err(err) => return (board, Some(SupervisorError::Spawn(err).into())),
        };

        let classifier = LineClassifier::new(&self.config.audio_format);
        let mut watchdog = Watchdog::new(self.config, Instant::now());

        let stop = loop {
            let (deadline, alarm) = watchdog.next_alarm();
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break Stop::Cancelled,
                // Ahead of output so a child that never pauses cannot starve
                // the deadlines.
                _ = tokio::time::sleep_until(deadline) => match alarm {
                    Alarm::Heartbeat => {
                        watchdog.heartbeat_sent(Instant::now());
                        sink.emit(Event::Heartbeat {
                            ts: chrono::Utc::now().timestamp(),
                        });
                    }
                    Alarm::Timeout(kind) => break Stop::TimedOut(kind),
                },
                line = lines.recv() => match line {
                    Some(Ok(line)) => {
                        watchdog.record_output(Instant::now());
                        engine_trace!("downloader: {}", line);
                        let (next, events) = update(board, Msg::Output(classifier.classify(&line)));
                        board = next;
                        for event in events {
                            sink.emit(event);
                        }
                    }
                    Some(Err(err)) => break Stop::ReadFailed(err),
                    None => break Stop::Eof,
                },
            }
        };

        let grace = self.config.kill_grace;
        let error = match stop {
            Stop::Eof => match guard.wait_exit(self.config.exit_wait).await {
                Some(status) => exit_error(status),
                None => {
                    engine_warn!(
                        "Downloader output ended but process is still running after {:?}",
                        self.config.exit_wait
                    );
                    guard.shutdown(grace).await;
                    None
                }
            },
            Stop::Cancelled => {
                engine_info!("Download cancelled; terminating downloader");
                guard.shutdown(grace).await;
                Some(JobError::Cancelled)
            }
            Stop::TimedOut(kind) => {
                let after = match kind {
                    TimeoutKind::Overall => self.config.download_timeout,
                    TimeoutKind::Inactivity => self.config.activity_timeout.unwrap_or_default(),
                };
                engine_warn!("Download timed out ({:?} after {:?}); terminating", kind, after);
                guard.shutdown(grace).await;
                Some(JobError::TimedOut { kind, after })
            }
            Stop::ReadFailed(err) => {
                engine_warn!("Reading downloader output failed: {}", err);
                guard.shutdown(grace).await;
                Some(SupervisorError::ReadFailed(err).into())
            }
        };

        (board, error)
    }
}

/// A non-zero exit is expected with per-item errors; dying from a signal we
/// did not send is not.
fn exit_error(status: ExitStatus) -> Option<JobError> {
    if status.code().is_none() {
        return Some(SupervisorError::Crashed(status.to_string()).into());
    }
    if !status.success() {
        engine_warn!("Downloader exited with {}", status);
    }
    None
}
