use std::path::PathBuf;

use engine_logging::{engine_debug, engine_warn};

use crate::{EngineConfig, JobError, ToolCommand};

const EXTRACTOR_NAMES: &[&str] = &["yt-dlp", "yt_dlp"];
const FFMPEG_NAMES: &[&str] = &["ffmpeg"];

/// A tool whose program path has been checked to exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTool {
    pub program: PathBuf,
    pub leading_args: Vec<String>,
}

impl ResolvedTool {
    pub(crate) fn command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.leading_args);
        cmd
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub extractor: ResolvedTool,
    pub ffmpeg: Option<ResolvedTool>,
}

/// Resolves the external binaries a job needs. The extractor is required;
/// ffmpeg is only reported with a warning when missing.
pub fn resolve_toolchain(config: &EngineConfig) -> Result<Toolchain, JobError> {
    let extractor = resolve(&config.extractor, EXTRACTOR_NAMES)
        .ok_or_else(|| JobError::ToolMissing(vec![EXTRACTOR_NAMES[0].to_string()]))?;
    let ffmpeg = resolve(&config.ffmpeg, FFMPEG_NAMES);
    if ffmpeg.is_none() {
        engine_warn!("ffmpeg not found on PATH; audio extraction may fail");
    }
    engine_debug!(
        "Resolved extractor {:?}, ffmpeg {:?}",
        extractor.program,
        ffmpeg.as_ref().map(|tool| &tool.program)
    );
    Ok(Toolchain { extractor, ffmpeg })
}

fn resolve(tool: &ToolCommand, default_names: &[&str]) -> Option<ResolvedTool> {
    let program = match &tool.program {
        Some(program) => which::which(program).ok()?,
        None => default_names
            .iter()
            .find_map(|name| which::which(name).ok())?,
    };
    Some(ResolvedTool {
        program,
        leading_args: tool.leading_args.clone(),
    })
}
