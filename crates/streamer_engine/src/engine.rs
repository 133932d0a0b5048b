use std::sync::Arc;

use engine_logging::engine_info;
use streamer_core::Event;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::job::{run_job, JobRequest};
use crate::sink::ChannelEventSink;
use crate::EngineConfig;

/// Starts jobs on the current tokio runtime. Cloning shares the configuration
/// and the shutdown token.
#[derive(Clone)]
pub struct EngineHandle {
    config: Arc<EngineConfig>,
    shutdown: CancellationToken,
}

impl EngineHandle {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config: Arc::new(config),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Starts a job and returns its event stream. Dropping the receiver
    /// cancels the job, which terminates its subprocess.
    pub fn start(&self, request: JobRequest) -> mpsc::UnboundedReceiver<Event> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let cancel = self.shutdown.child_token();

        let watcher_tx = event_tx.clone();
        let watcher_cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = watcher_tx.closed() => {
                    engine_info!("Client disconnected; cancelling job");
                    watcher_cancel.cancel();
                }
                _ = watcher_cancel.cancelled() => {}
            }
        });

        let config = self.config.clone();
        tokio::spawn(async move {
            let sink = ChannelEventSink::new(event_tx);
            let report = run_job(&config, &request, &sink, &cancel).await;
            engine_info!("Job for {:?} ended: {:?}", request.source, report);
            // Releases the disconnect watcher.
            cancel.cancel();
        });

        event_rx
    }

    /// Cancels every running job.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}
