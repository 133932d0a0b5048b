//! Streamer engine: subprocess supervision, playlist enumeration and job lifecycle.
mod config;
mod engine;
mod error;
mod fetch;
mod job;
mod lifecycle;
mod persist;
mod process;
mod sink;
mod supervisor;
mod tools;

pub use config::{EngineConfig, ToolCommand};
pub use engine::EngineHandle;
pub use error::{FetchError, JobError, SupervisorError, TimeoutKind, ValidationError};
pub use fetch::{ExtractorFetcher, FetchSettings, PlaylistFetcher};
pub use job::{run_job, validate_source, JobReport, JobRequest};
pub use lifecycle::{Alarm, Watchdog};
pub use persist::ensure_output_dir;
pub use process::{OutputLine, ProcessGuard};
pub use sink::{ChannelEventSink, EventSink};
pub use supervisor::{DownloadSupervisor, OUTPUT_TEMPLATE};
pub use tools::{resolve_toolchain, ResolvedTool, Toolchain};
