//! Shared fixtures: a `Toolchain` made of `sh` one-liners, a clock the
//! test moves by hand, and a frontend that just remembers what it was
//! asked to show.

#![allow(dead_code)]

use areacast_lib::artifact::Artifact;
use areacast_lib::capture::{CommandSpec, Toolchain};
use areacast_lib::frontend::Frontend;
use areacast_lib::geometry::Rect;
use areacast_lib::selection::{DrawOp, SelectionPurpose};
use areacast_lib::session::Clock;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorder {
    /// Writes a line naming its output, then runs until SIGTERM.
    Healthy,
    /// Creates an empty output file, then runs until SIGTERM.
    Empty,
    /// Reports an error on stderr and keeps running.
    Failing,
    /// The program does not exist.
    Missing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Converter {
    /// Copies input to output.
    Copy,
    /// Writes junk to the output, then exits non-zero.
    Broken,
}

#[derive(Debug, Clone)]
pub struct ScriptToolchain {
    pub recorder: Recorder,
    pub concat_fails: bool,
    pub converter: Converter,
}

impl Default for ScriptToolchain {
    fn default() -> Self {
        Self {
            recorder: Recorder::Healthy,
            concat_fails: false,
            converter: Converter::Copy,
        }
    }
}

fn sh(script: &str, args: &[&Path]) -> CommandSpec {
    CommandSpec::new("sh")
        .args(["-c", script, "sh"])
        .args(args.iter().map(|p| p.to_string_lossy().into_owned()))
}

const RUN_UNTIL_TERM: &str = "trap 'exit 0' TERM; while true; do sleep 0.05; done";

impl Toolchain for ScriptToolchain {
    fn record_region(&self, region: Rect, output: &Path) -> CommandSpec {
        let script = match self.recorder {
            Recorder::Healthy => format!(
                "trap 'exit 0' TERM; printf 'segment %s {}x{}\\n' \"$(basename \"$1\")\" > \"$1\"; \
                 while true; do sleep 0.05; done",
                region.width, region.height
            ),
            Recorder::Empty => format!(": > \"$1\"; {}", RUN_UNTIL_TERM),
            Recorder::Failing => {
                format!("echo 'Error opening input device :0' >&2; {}", RUN_UNTIL_TERM)
            }
            Recorder::Missing => {
                return CommandSpec::new("areacast-no-such-recorder").arg(output.to_string_lossy())
            }
        };
        sh(&script, &[output])
    }

    fn capture_still(&self, region: Rect, output: &Path) -> CommandSpec {
        let script = format!("printf 'still {}x{}' > \"$1\"", region.width, region.height);
        sh(&script, &[output])
    }

    fn concat(&self, manifest: &Path, output: &Path) -> CommandSpec {
        if self.concat_fails {
            return sh("echo 'Invalid data found when processing input' >&2; exit 1", &[]);
        }
        sh(
            "sed -n \"s/^file '\\(.*\\)'\\$/\\1/p\" \"$1\" | while IFS= read -r f; do cat \"$f\"; done > \"$2\"",
            &[manifest, output],
        )
    }

    fn video_to_gif(&self, source: &Path, destination: &Path) -> CommandSpec {
        self.convert(source, destination)
    }

    fn image_to_jpeg(&self, source: &Path, destination: &Path) -> CommandSpec {
        self.convert(source, destination)
    }
}

impl ScriptToolchain {
    fn convert(&self, source: &Path, destination: &Path) -> CommandSpec {
        match self.converter {
            Converter::Copy => sh("cp \"$1\" \"$2\"", &[source, destination]),
            Converter::Broken => sh(
                "printf 'half a file' > \"$2\"; echo 'Conversion failed' >&2; exit 1",
                &[source, destination],
            ),
        }
    }
}

pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap()
    }
}

#[derive(Debug, Default)]
pub struct RecordingFrontend {
    pub calls: Vec<String>,
    pub errors: Vec<(String, String)>,
    pub infos: Vec<(String, String)>,
    pub previews: Vec<Artifact>,
    pub controls: Vec<(String, bool)>,
    pub countdowns: Vec<u32>,
    pub instructions: Vec<String>,
}

impl RecordingFrontend {
    pub fn called(&self, name: &str) -> bool {
        self.calls.iter().any(|c| c == name)
    }

    pub fn last_call(&self) -> Option<&str> {
        self.calls.last().map(String::as_str)
    }
}

impl Frontend for RecordingFrontend {
    fn show_entry(&mut self) {
        self.calls.push("show_entry".into());
    }

    fn hide_entry(&mut self) {
        self.calls.push("hide_entry".into());
    }

    fn show_selector(&mut self, _purpose: SelectionPurpose, instructions: &str, _ops: &[DrawOp]) {
        self.calls.push("show_selector".into());
        self.instructions.push(instructions.to_string());
    }

    fn update_selector(&mut self, _ops: &[DrawOp]) {
        self.calls.push("update_selector".into());
    }

    fn set_instructions(&mut self, text: &str) {
        self.calls.push("set_instructions".into());
        self.instructions.push(text.to_string());
    }

    fn hide_selector(&mut self) {
        self.calls.push("hide_selector".into());
    }

    fn show_countdown(&mut self, remaining: u32) {
        self.calls.push("show_countdown".into());
        self.countdowns.push(remaining);
    }

    fn hide_countdown(&mut self) {
        self.calls.push("hide_countdown".into());
    }

    fn show_controls(&mut self, _origin: (u32, u32), _region: Rect) {
        self.calls.push("show_controls".into());
    }

    fn update_controls(&mut self, elapsed: &str, paused: bool) {
        self.calls.push("update_controls".into());
        self.controls.push((elapsed.to_string(), paused));
    }

    fn hide_controls(&mut self) {
        self.calls.push("hide_controls".into());
    }

    fn show_preview(&mut self, artifact: &Artifact, _display_size: Option<(u32, u32)>) {
        self.calls.push("show_preview".into());
        self.previews.push(artifact.clone());
    }

    fn hide_preview(&mut self) {
        self.calls.push("hide_preview".into());
    }

    fn begin_progress(&mut self, message: &str) {
        self.calls.push(format!("begin_progress:{}", message));
    }

    fn end_progress(&mut self) {
        self.calls.push("end_progress".into());
    }

    fn show_error(&mut self, title: &str, message: &str) {
        self.calls.push("show_error".into());
        self.errors.push((title.to_string(), message.to_string()));
    }

    fn show_info(&mut self, title: &str, message: &str) {
        self.calls.push("show_info".into());
        self.infos.push((title.to_string(), message.to_string()));
    }
}

/// Polls until `path` exists with content, so a test never stops a fake
/// recorder before it has written anything.
pub async fn wait_for_content(path: &Path) {
    for _ in 0..200 {
        if std::fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{} never got content", path.display());
}

/// Polls until `path` exists (possibly empty).
pub async fn wait_for_file(path: &Path) {
    for _ in 0..200 {
        if path.exists() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{} was never created", path.display());
}

/// Names of the files directly inside `dir`, sorted.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

pub fn segment_files(dir: &Path) -> Vec<String> {
    file_names(dir)
        .into_iter()
        .filter(|n| n.starts_with("temp_segment_") || n.starts_with("file_list_"))
        .collect()
}

pub fn scratch_dirs(root: &Path) -> (PathBuf, PathBuf) {
    let work = root.join("work");
    let out = root.join("out");
    std::fs::create_dir_all(&work).unwrap();
    std::fs::create_dir_all(&out).unwrap();
    (work, out)
}
