//! Screen capture domain: public API.
//!
//! This module owns every interaction with the external capture tools:
//! building their command lines, running them, watching their
//! diagnostics and stopping them. External code should only use what is
//! exported here.

mod command;
mod monitor;
mod process;
mod screenshot;

pub use command::{
    run_tool, CommandSpec, FfmpegToolchain, ToolOutput, Toolchain, GIF_FPS, GIF_WIDTH,
    JPEG_QUALITY,
};
pub use monitor::{watch as watch_diagnostics, MonitorOptions, MonitorVerdict};
pub use process::{CaptureProcess, ProcessOptions, StopOutcome, DEFAULT_STOP_GRACE};
pub use screenshot::take_screenshot;

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Capture error: {0}")]
    Stream(String),

    #[error(
        "Capture tool exited with status {}: {diagnostics}",
        status.map_or("unknown".to_string(), |c| c.to_string())
    )]
    CommandFailed {
        status: Option<i32>,
        diagnostics: String,
    },

    #[error("Capture produced no output at {}", .0.display())]
    MissingOutput(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
