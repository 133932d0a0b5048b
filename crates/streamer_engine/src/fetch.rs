use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};
use serde::Deserialize;
use streamer_core::{TrackDescriptor, TrackListBuilder};
use tokio_util::sync::CancellationToken;

use crate::process::ProcessGuard;
use crate::tools::ResolvedTool;
use crate::{EngineConfig, FetchError, JobError, ValidationError};

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub socket_timeout: Duration,
    pub timeout: Duration,
    pub max_tracks: usize,
    pub kill_grace: Duration,
    pub exit_wait: Duration,
}

impl From<&EngineConfig> for FetchSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            socket_timeout: config.fetch_socket_timeout,
            timeout: config.fetch_timeout,
            max_tracks: config.max_tracks,
            kill_grace: config.kill_grace,
            exit_wait: config.exit_wait,
        }
    }
}

/// Enumerates a playlist into queued track descriptors with positions 1..=N.
#[async_trait::async_trait]
pub trait PlaylistFetcher: Send + Sync {
    async fn fetch(
        &self,
        source: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<TrackDescriptor>, JobError>;
}

/// Runs the extractor in flat-playlist mode and reads one JSON record per line.
#[derive(Debug, Clone)]
pub struct ExtractorFetcher {
    tool: ResolvedTool,
    settings: FetchSettings,
}

impl ExtractorFetcher {
    pub fn new(tool: ResolvedTool, settings: FetchSettings) -> Self {
        Self { tool, settings }
    }

    fn command(&self, source: &str) -> tokio::process::Command {
        let mut cmd = self.tool.command();
        cmd.args(["--flat-playlist", "--print-json", "--no-warnings", "--socket-timeout"])
            .arg(self.settings.socket_timeout.as_secs().max(1).to_string())
            .arg("--")
            .arg(source);
        cmd
    }
}

#[derive(Debug, Deserialize)]
struct FlatEntry {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Default)]
struct Listing {
    builder: TrackListBuilder,
    last_diagnostic: Option<String>,
}

impl Listing {
    fn accept(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        match serde_json::from_str::<FlatEntry>(line) {
            Ok(entry) => {
                self.builder.push(entry.id.as_deref(), entry.title.as_deref());
            }
            Err(err) => {
                engine_debug!("Skipping non-json enumeration line ({}): {}", err, line);
                self.last_diagnostic = Some(line.to_string());
            }
        }
    }
}

#[async_trait::async_trait]
impl PlaylistFetcher for ExtractorFetcher {
    async fn fetch(
        &self,
        source: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<TrackDescriptor>, JobError> {
        let cmd = self.command(source);
        engine_info!("Fetching playlist with command: {:?}", cmd.as_std());
        let (mut guard, mut lines) =
            ProcessGuard::spawn(cmd, "enumeration").map_err(FetchError::Spawn)?;

        let mut listing = Listing::default();
        let read_all = async {
            while let Some(line) = lines.recv().await {
                listing.accept(&line?);
            }
            Ok::<(), std::io::Error>(())
        };

        let read = tokio::select! {
            _ = cancel.cancelled() => Err(JobError::Cancelled),
            result = tokio::time::timeout(self.settings.timeout, read_all) => match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(err)) => Err(FetchError::Io(err).into()),
                Err(_) => Err(FetchError::TimedOut(self.settings.timeout).into()),
            },
        };
        if let Err(err) = read {
            guard.shutdown(self.settings.kill_grace).await;
            return Err(err);
        }

        let exited = guard.wait_exit(self.settings.exit_wait).await;
        let status = match exited {
            Some(status) => Some(status),
            None => guard.shutdown(self.settings.kill_grace).await,
        };

        let tracks = listing.builder.finish();
        engine_info!("Enumeration produced {} tracks (status {:?})", tracks.len(), status);

        if tracks.is_empty() {
            return match status {
                Some(status) if !status.success() => Err(FetchError::Exited {
                    status: status.to_string(),
                    detail: listing.last_diagnostic,
                }
                .into()),
                None => Err(FetchError::Exited {
                    status: "no exit status".to_string(),
                    detail: listing.last_diagnostic,
                }
                .into()),
                Some(_) => Err(FetchError::Empty.into()),
            };
        }
        if let Some(status) = status.filter(|status| !status.success()) {
            engine_warn!(
                "Enumeration exited with {} but returned {} tracks; continuing",
                status,
                tracks.len()
            );
        }
        if tracks.len() > self.settings.max_tracks {
            return Err(ValidationError::TooManyTracks {
                count: tracks.len(),
                limit: self.settings.max_tracks,
            }
            .into());
        }
        Ok(tracks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_skips_noise_and_keeps_last_diagnostic() {
        let mut listing = Listing::default();
        listing.accept("WARNING: something odd");
        listing.accept(r#"{"id": "a1", "title": "One", "playlist_index": 1}"#);
        listing.accept("   ");
        listing.accept("{not json");
        listing.accept(r#"{"title": null}"#);
        listing.accept(r#"[1, 2]"#);

        assert_eq!(listing.last_diagnostic.as_deref(), Some("[1, 2]"));
        let tracks = listing.builder.finish();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].id, "a1");
        assert_eq!(tracks[1].id, "item_1");
        assert_eq!(tracks[1].title, "Untitled Track");
    }
}
