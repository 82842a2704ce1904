//! Command lines for the external capture and transcode tools.
//!
//! Every external invocation in the app goes through a `Toolchain`, so
//! the rest of the code only knows "record this region to this path",
//! never which binary or flags do it.

use crate::geometry::Rect;
use std::fmt;
use std::path::Path;
use std::process::{ExitStatus, Stdio};

/// GIF export frame rate.
pub const GIF_FPS: u32 = 10;
/// GIF export width in pixels; height follows the aspect ratio.
pub const GIF_WIDTH: u32 = 320;
/// JPEG re-encode quality (0-100).
pub const JPEG_QUALITY: u32 = 85;

/// A fully resolved program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn to_command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Builds the command line for each external operation.
pub trait Toolchain: Send + Sync {
    /// Long-running region recorder; stops on SIGTERM with a valid file.
    fn record_region(&self, region: Rect, output: &Path) -> CommandSpec;

    /// One-shot region grab; exits when the image is written.
    fn capture_still(&self, region: Rect, output: &Path) -> CommandSpec;

    /// Stream-copy concatenation of the files listed in `manifest`.
    fn concat(&self, manifest: &Path, output: &Path) -> CommandSpec;

    fn video_to_gif(&self, source: &Path, destination: &Path) -> CommandSpec;

    fn image_to_jpeg(&self, source: &Path, destination: &Path) -> CommandSpec;
}

/// ffmpeg (x11grab) for video, ImageMagick for stills and JPEG.
#[derive(Debug, Clone)]
pub struct FfmpegToolchain {
    pub ffmpeg: String,
    pub import: String,
    pub convert: String,
    pub display: String,
}

impl Default for FfmpegToolchain {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            import: "import".to_string(),
            convert: "convert".to_string(),
            display: ":1".to_string(),
        }
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl Toolchain for FfmpegToolchain {
    fn record_region(&self, region: Rect, output: &Path) -> CommandSpec {
        CommandSpec::new(&self.ffmpeg)
            // Keep stderr line-oriented for the failure monitor.
            .args(["-hide_banner", "-nostats"])
            .args(["-f", "x11grab"])
            .arg("-video_size")
            .arg(format!("{}x{}", region.width, region.height))
            .arg("-i")
            .arg(format!("{}+{},{}", self.display, region.x, region.y))
            .args(["-c:v", "libx264", "-preset", "ultrafast", "-pix_fmt", "yuv420p"])
            .arg("-y")
            .arg(path_arg(output))
    }

    fn capture_still(&self, region: Rect, output: &Path) -> CommandSpec {
        CommandSpec::new(&self.import)
            .args(["-window", "root", "-crop"])
            .arg(format!(
                "{}x{}+{}+{}",
                region.width, region.height, region.x, region.y
            ))
            .arg(path_arg(output))
    }

    fn concat(&self, manifest: &Path, output: &Path) -> CommandSpec {
        CommandSpec::new(&self.ffmpeg)
            .args(["-hide_banner", "-f", "concat", "-safe", "0", "-i"])
            .arg(path_arg(manifest))
            .args(["-c", "copy", "-y"])
            .arg(path_arg(output))
    }

    fn video_to_gif(&self, source: &Path, destination: &Path) -> CommandSpec {
        CommandSpec::new(&self.ffmpeg)
            .args(["-hide_banner", "-i"])
            .arg(path_arg(source))
            .arg("-vf")
            .arg(format!(
                "fps={GIF_FPS},scale={GIF_WIDTH}:-1:flags=lanczos,split[s0][s1];[s0]palettegen[p];[s1][p]paletteuse"
            ))
            .arg("-y")
            .arg(path_arg(destination))
    }

    fn image_to_jpeg(&self, source: &Path, destination: &Path) -> CommandSpec {
        CommandSpec::new(&self.convert)
            .arg(path_arg(source))
            .arg("-quality")
            .arg(JPEG_QUALITY.to_string())
            .arg(path_arg(destination))
    }
}

/// Exit status plus captured diagnostics of a finished tool run.
#[derive(Debug)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Exit code for error messages; `None` when killed by a signal.
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }
}

/// Runs a tool to completion, capturing stderr.
pub async fn run_tool(spec: &CommandSpec) -> std::io::Result<ToolOutput> {
    log::info!("[TOOL] Running: {}", spec);
    let start = std::time::Instant::now();

    let output = spec
        .to_command()
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await?;

    log::info!(
        "[TOOL] {} finished with {} in {}ms",
        spec.program,
        output.status,
        start.elapsed().as_millis()
    );

    Ok(ToolOutput {
        status: output.status,
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}
