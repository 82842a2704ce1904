//! Recording session domain: public API.
//!
//! A `SessionController` owns everything about one recording: the state
//! machine, the ordered list of committed segments, the one capture
//! process that may be live, and the elapsed-time bookkeeping. It lives on
//! the UI loop and is only ever mutated from there; the capture monitor
//! reaches it indirectly by posting `AppEvent::CaptureFailed`.

mod clock;
mod merge;
mod segment;
mod state;

pub use clock::{format_elapsed, Clock, ElapsedTime, SystemClock};
pub use merge::{build_manifest, merge_segments};
pub use segment::{remove_segment_files, Segment, SessionPaths};
pub use state::{InvalidTransition, SessionAction, SessionState, StateMachine};

use crate::artifact::Artifact;
use crate::capture::{CaptureError, CaptureProcess, ProcessOptions, Toolchain};
use crate::event::{AppEvent, EventSender};
use crate::geometry::Rect;
use chrono::Local;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Transition(#[from] InvalidTransition),

    #[error(transparent)]
    Capture(#[from] CaptureError),
}

#[derive(Debug, thiserror::Error)]
pub enum FinalizeError {
    #[error("No video segments found")]
    NoSegments,

    #[error("Video file is empty (0 bytes): {}", .0.display())]
    EmptyOutput(PathBuf),

    #[error(
        "Merging segments failed with status {}: {diagnostics}",
        status.map_or("unknown".to_string(), |c| c.to_string())
    )]
    Merge {
        status: Option<i32>,
        diagnostics: String,
    },

    #[error("Final video was not created: {}", .0.display())]
    Verification(PathBuf),

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug)]
pub enum EndOutcome {
    Finalized(Artifact),
    Failed(FinalizeError),
    /// The session had already been finalized, failed or abandoned.
    AlreadyFinished,
}

// Epochs are unique across sessions so a late message from an old
// process can never match a newer one.
static NEXT_EPOCH: AtomicU64 = AtomicU64::new(1);

fn next_epoch() -> u64 {
    NEXT_EPOCH.fetch_add(1, Ordering::Relaxed)
}

pub struct SessionController {
    region: Rect,
    machine: StateMachine,
    segments: Vec<Segment>,
    process: Option<CaptureProcess>,
    elapsed: ElapsedTime,
    clock: Arc<dyn Clock>,
    toolchain: Arc<dyn Toolchain>,
    options: ProcessOptions,
    paths: SessionPaths,
    events: EventSender,
    epoch: u64,
    next_seq: u32,
}

impl SessionController {
    pub fn new(
        region: Rect,
        toolchain: Arc<dyn Toolchain>,
        options: ProcessOptions,
        paths: SessionPaths,
        events: EventSender,
    ) -> Self {
        Self {
            region,
            machine: StateMachine::new(),
            segments: Vec::new(),
            process: None,
            elapsed: ElapsedTime::default(),
            clock: Arc::new(SystemClock),
            toolchain,
            options,
            paths,
            events,
            epoch: next_epoch(),
            next_seq: 1,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn region(&self) -> Rect {
        self.region
    }

    pub fn state(&self) -> SessionState {
        self.machine.current()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Identifies the live segment. Changes whenever a process is started
    /// or stopped, so ticks and failure reports carrying an older value
    /// are stale.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed.total(self.clock.now())
    }

    pub fn elapsed_display(&self) -> String {
        format_elapsed(self.elapsed())
    }

    pub async fn start(&mut self) -> Result<(), SessionError> {
        self.machine.start()?;
        log::info!(
            "[SESSION] Recording {}x{} at ({}, {})",
            self.region.width,
            self.region.height,
            self.region.x,
            self.region.y
        );
        self.begin_segment()
    }

    pub async fn pause(&mut self) -> Result<(), SessionError> {
        self.machine.pause()?;
        self.elapsed.end_segment(self.clock.now());
        self.stop_process().await;
        log::info!(
            "[SESSION] Paused after {} ({} segments)",
            self.elapsed_display(),
            self.segments.len()
        );
        Ok(())
    }

    pub async fn resume(&mut self) -> Result<(), SessionError> {
        self.machine.resume()?;
        log::info!("[SESSION] Resuming");
        self.begin_segment()
    }

    pub async fn toggle_pause(&mut self) -> Result<(), SessionError> {
        match self.state() {
            SessionState::Recording => self.pause().await,
            _ => self.resume().await,
        }
    }

    /// Throws away everything recorded so far and starts a fresh segment.
    pub async fn start_over(&mut self) -> Result<(), SessionError> {
        self.machine.start_over()?;
        self.stop_process().await;
        let removed = remove_segment_files(&self.segments);
        self.segments.clear();
        self.elapsed.reset();
        log::info!("[SESSION] Starting over ({} segment files removed)", removed);
        self.begin_segment()
    }

    /// Stops recording and merges the segments. Runs the merge at most
    /// once per session.
    pub async fn end(&mut self) -> EndOutcome {
        let state = self.state();
        if state.is_terminal() {
            log::debug!("[SESSION] end() ignored, session is {:?}", state);
            return EndOutcome::AlreadyFinished;
        }
        if self.machine.end().is_err() {
            // Never started: nothing to merge.
            let _ = self.machine.fail();
            return EndOutcome::Failed(FinalizeError::NoSegments);
        }

        self.elapsed.end_segment(self.clock.now());
        self.stop_process().await;
        log::info!(
            "[SESSION] Finalizing {} segments ({} recorded)",
            self.segments.len(),
            self.elapsed_display()
        );

        let result =
            merge_segments(self.toolchain.as_ref(), &self.segments, &self.paths, Local::now())
                .await;

        // Whatever the merge left behind is no longer needed.
        remove_segment_files(&self.segments);
        self.segments.clear();

        match result {
            Ok(artifact) => {
                let _ = self.machine.complete();
                log::info!("[SESSION] Saved {}", artifact.path.display());
                EndOutcome::Finalized(artifact)
            }
            Err(e) => {
                let _ = self.machine.fail();
                log::error!("[SESSION] Finalization failed: {}", e);
                EndOutcome::Failed(e)
            }
        }
    }

    /// The capture tool reported an error: drop the recording.
    pub async fn fail(&mut self, message: &str) {
        if self.state().is_terminal() {
            return;
        }
        log::error!("[SESSION] Capture failed: {}", message);
        self.discard().await;
    }

    /// The control surface went away before the recording was ended.
    pub async fn abandon(&mut self) {
        if self.state().is_terminal() {
            return;
        }
        log::info!("[SESSION] Abandoned after {}", self.elapsed_display());
        self.discard().await;
    }

    async fn discard(&mut self) {
        self.elapsed.end_segment(self.clock.now());
        self.stop_process().await;
        let removed = remove_segment_files(&self.segments);
        self.segments.clear();
        let _ = self.machine.fail();
        log::debug!("[SESSION] Discarded {} segment files", removed);
    }

    fn begin_segment(&mut self) -> Result<(), SessionError> {
        if let Err(e) = std::fs::create_dir_all(&self.paths.work_dir) {
            self.abort_start();
            return Err(CaptureError::Io(e).into());
        }

        let created_at = Local::now();
        let path = self.paths.segment_path(created_at, self.next_seq);
        self.next_seq += 1;

        let spec = self.toolchain.record_region(self.region, &path);
        self.epoch = next_epoch();
        let epoch = self.epoch;
        let events = self.events.clone();

        let process = match CaptureProcess::start(&spec, &self.options, move |message| {
            let _ = events.send(AppEvent::CaptureFailed { epoch, message });
        }) {
            Ok(process) => process,
            Err(e) => {
                log::error!("[SESSION] Could not start capture: {}", e);
                self.abort_start();
                return Err(e.into());
            }
        };

        log::info!(
            "[SESSION] Segment {} -> {}",
            self.segments.len() + 1,
            path.display()
        );
        self.process = Some(process);
        self.segments.push(Segment { path, created_at });
        self.elapsed.begin_segment(self.clock.now());
        Ok(())
    }

    fn abort_start(&mut self) {
        remove_segment_files(&self.segments);
        self.segments.clear();
        let _ = self.machine.fail();
    }

    async fn stop_process(&mut self) {
        if let Some(mut process) = self.process.take() {
            process.stop().await;
        }
        self.epoch = next_epoch();
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        // The process itself is killed on drop; its partial files are ours.
        if !self.segments.is_empty() {
            remove_segment_files(&self.segments);
        }
    }
}
