//! The single-owner UI loop.
//!
//! `App` holds every piece of mutable state: which surface is up, the
//! selection engine, the recording session, the finished artifact. Only
//! `handle` mutates it, one `AppEvent` at a time. Timers and capture
//! monitors run as separate tasks and can only post events.

use crate::artifact::Artifact;
use crate::capture::{take_screenshot, CaptureError, Toolchain};
use crate::config::AppConfig;
use crate::event::{schedule, AppEvent, EventSender, Key, PointerEvent};
use crate::export::{export, resolve_destination, FormatFilter};
use crate::frontend::Frontend;
use crate::geometry::{control_strip_origin, Rect};
use crate::preview::{self, PlayOutcome, PreviewError, FALLBACK_PLAYERS, PLAYER_SUGGESTIONS};
use crate::selection::{render, SelectionEngine, SelectionPurpose, SelectionResponse};
use crate::session::{
    Clock, EndOutcome, SessionController, SessionError, SessionState, SystemClock,
};
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

const TICK: Duration = Duration::from_secs(1);
const MERGE_PROGRESS: &str = "Merging recording segments...";

/// Which surface is currently in charge of input.
enum Surface {
    Entry,
    Selecting(SelectionEngine),
    Countdown {
        region: Rect,
        remaining: u32,
        epoch: u64,
    },
    Recording(SessionController),
    Preview(Artifact),
}

impl Surface {
    fn name(&self) -> &'static str {
        match self {
            Surface::Entry => "entry",
            Surface::Selecting(_) => "selecting",
            Surface::Countdown { .. } => "countdown",
            Surface::Recording(_) => "recording",
            Surface::Preview(_) => "preview",
        }
    }
}

pub struct App<F: Frontend> {
    config: AppConfig,
    toolchain: Arc<dyn Toolchain>,
    clock: Arc<dyn Clock>,
    frontend: F,
    events: EventSender,
    surface: Surface,
    countdown_epoch: u64,
}

impl<F: Frontend> App<F> {
    pub fn new(
        config: AppConfig,
        toolchain: Arc<dyn Toolchain>,
        frontend: F,
        events: EventSender,
    ) -> Self {
        Self {
            config,
            toolchain,
            clock: Arc::new(SystemClock),
            frontend,
            events,
            surface: Surface::Entry,
            countdown_epoch: 0,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn frontend(&self) -> &F {
        &self.frontend
    }

    pub fn frontend_mut(&mut self) -> &mut F {
        &mut self.frontend
    }

    pub fn surface_name(&self) -> &'static str {
        self.surface.name()
    }

    /// State of the running session, if one is up.
    pub fn session_state(&self) -> Option<SessionState> {
        match &self.surface {
            Surface::Recording(session) => Some(session.state()),
            _ => None,
        }
    }

    pub fn session(&self) -> Option<&SessionController> {
        match &self.surface {
            Surface::Recording(session) => Some(session),
            _ => None,
        }
    }

    /// The finished capture shown in the preview.
    pub fn artifact(&self) -> Option<&Artifact> {
        match &self.surface {
            Surface::Preview(artifact) => Some(artifact),
            _ => None,
        }
    }

    /// Puts up the entry point.
    pub fn open(&mut self) {
        log::info!("[APP] Ready");
        self.frontend.show_entry();
    }

    pub async fn handle(&mut self, event: AppEvent) -> ControlFlow<()> {
        log::debug!("[APP] {:?} on {}", event, self.surface.name());
        match event {
            AppEvent::Exit => return self.exit().await,
            AppEvent::Key(key) => return self.on_key(key).await,
            AppEvent::Record => self.begin_selection(SelectionPurpose::Record),
            AppEvent::Screenshot => self.begin_selection(SelectionPurpose::Screenshot),
            AppEvent::Pointer(pointer) => self.on_pointer(pointer).await,
            AppEvent::CountdownTick { epoch } => self.on_countdown_tick(epoch).await,
            AppEvent::ElapsedTick { epoch } => self.on_elapsed_tick(epoch),
            AppEvent::End => self.end_recording().await,
            AppEvent::TogglePause => self.toggle_pause().await,
            AppEvent::StartOver => self.start_over().await,
            AppEvent::ControlsClosed => self.abandon_recording().await,
            AppEvent::CaptureFailed { epoch, message } => {
                self.on_capture_failed(epoch, message).await
            }
            AppEvent::SaveAs {
                destination,
                filter,
            } => self.save_as(destination, filter).await,
            AppEvent::OpenFolder => self.open_folder(),
            AppEvent::Play => self.play().await,
            AppEvent::ClosePreview => self.close_preview(),
        }
        ControlFlow::Continue(())
    }

    async fn exit(&mut self) -> ControlFlow<()> {
        if let Surface::Recording(session) = &mut self.surface {
            session.abandon().await;
        }
        self.surface = Surface::Entry;
        log::info!("[APP] Exiting");
        ControlFlow::Break(())
    }

    async fn on_key(&mut self, key: Key) -> ControlFlow<()> {
        if let Surface::Selecting(engine) = &mut self.surface {
            let response = engine.handle_key(&key);
            self.on_selection_response(response).await;
            return ControlFlow::Continue(());
        }
        let on_entry = matches!(self.surface, Surface::Entry);
        let recording = matches!(self.surface, Surface::Recording(_));
        match key {
            Key::Escape if on_entry => return self.exit().await,
            Key::Escape if recording => self.end_recording().await,
            Key::Space if recording => self.toggle_pause().await,
            _ => {}
        }
        ControlFlow::Continue(())
    }

    // --- selection -------------------------------------------------------

    fn begin_selection(&mut self, purpose: SelectionPurpose) {
        if !matches!(self.surface, Surface::Entry) {
            log::debug!("[APP] Ignoring {:?} request on {}", purpose, self.surface.name());
            return;
        }
        let engine =
            SelectionEngine::new(self.config.selection_mode, purpose, self.config.screen);
        self.frontend.hide_entry();
        self.frontend.show_selector(
            purpose,
            &engine.instructions(),
            &render(engine.state(), self.config.screen),
        );
        self.surface = Surface::Selecting(engine);
    }

    async fn on_pointer(&mut self, pointer: PointerEvent) {
        let Surface::Selecting(engine) = &mut self.surface else {
            return;
        };
        let response = engine.handle_pointer(pointer);
        self.on_selection_response(response).await;
    }

    async fn on_selection_response(&mut self, response: SelectionResponse) {
        let Surface::Selecting(engine) = &self.surface else {
            return;
        };
        match response {
            SelectionResponse::Ignored => {}
            SelectionResponse::Redraw | SelectionResponse::TooSmall => {
                let ops = render(engine.state(), self.config.screen);
                self.frontend.update_selector(&ops);
            }
            SelectionResponse::InstructionsChanged(text) => {
                let ops = render(engine.state(), self.config.screen);
                self.frontend.set_instructions(&text);
                self.frontend.update_selector(&ops);
            }
            SelectionResponse::Cancelled => {
                self.frontend.hide_selector();
                self.surface = Surface::Entry;
                self.frontend.show_entry();
            }
            SelectionResponse::Record(region) => {
                self.frontend.hide_selector();
                self.begin_countdown(region).await;
            }
            SelectionResponse::Screenshot(region) => {
                self.frontend.hide_selector();
                self.capture_still(region).await;
            }
        }
    }

    async fn capture_still(&mut self, region: Rect) {
        let dir = self.config.screenshots_dir();
        match take_screenshot(self.toolchain.as_ref(), region, &dir).await {
            Ok(artifact) => self.show_preview(artifact),
            Err(e) => {
                log::error!("[APP] Screenshot failed: {}", e);
                self.surface = Surface::Entry;
                self.frontend.show_error("Screenshot Error", &e.to_string());
                self.frontend.show_entry();
            }
        }
    }

    // --- countdown -------------------------------------------------------

    async fn begin_countdown(&mut self, region: Rect) {
        let secs = self.config.countdown_secs;
        if secs == 0 {
            self.start_recording(region).await;
            return;
        }
        self.countdown_epoch += 1;
        let epoch = self.countdown_epoch;
        self.surface = Surface::Countdown {
            region,
            remaining: secs,
            epoch,
        };
        self.frontend.show_countdown(secs);
        schedule(&self.events, TICK, AppEvent::CountdownTick { epoch });
    }

    async fn on_countdown_tick(&mut self, tick_epoch: u64) {
        let Surface::Countdown {
            region,
            remaining,
            epoch,
        } = &mut self.surface
        else {
            return;
        };
        if *epoch != tick_epoch {
            return;
        }
        *remaining = remaining.saturating_sub(1);
        if *remaining > 0 {
            self.frontend.show_countdown(*remaining);
            schedule(&self.events, TICK, AppEvent::CountdownTick { epoch: tick_epoch });
            return;
        }
        let region = *region;
        self.frontend.hide_countdown();
        self.start_recording(region).await;
    }

    // --- recording -------------------------------------------------------

    async fn start_recording(&mut self, region: Rect) {
        let mut session = SessionController::new(
            region,
            Arc::clone(&self.toolchain),
            self.config.process_options(),
            self.config.session_paths(),
            self.events.clone(),
        )
        .with_clock(Arc::clone(&self.clock));

        if let Err(e) = session.start().await {
            self.surface = Surface::Entry;
            self.frontend.show_error("Recording Error", &e.to_string());
            self.frontend.show_entry();
            return;
        }

        let origin = control_strip_origin(region, self.config.screen);
        self.frontend.show_controls(origin, region);
        self.frontend.update_controls(&session.elapsed_display(), false);
        schedule(
            &self.events,
            TICK,
            AppEvent::ElapsedTick {
                epoch: session.epoch(),
            },
        );
        self.surface = Surface::Recording(session);
    }

    fn on_elapsed_tick(&mut self, epoch: u64) {
        let Surface::Recording(session) = &self.surface else {
            return;
        };
        if session.epoch() != epoch || session.state() != SessionState::Recording {
            return;
        }
        self.frontend.update_controls(&session.elapsed_display(), false);
        schedule(&self.events, TICK, AppEvent::ElapsedTick { epoch });
    }

    async fn toggle_pause(&mut self) {
        let Surface::Recording(session) = &mut self.surface else {
            return;
        };
        let result = session.toggle_pause().await;
        self.after_session_change(result);
    }

    async fn start_over(&mut self) {
        let Surface::Recording(session) = &mut self.surface else {
            return;
        };
        let result = session.start_over().await;
        self.after_session_change(result);
    }

    /// Refreshes the strip after pause / resume / start over and restarts
    /// the elapsed timer when a new segment went live.
    fn after_session_change(&mut self, result: Result<(), SessionError>) {
        let Surface::Recording(session) = &self.surface else {
            return;
        };
        match result {
            Ok(()) => {
                let paused = session.state() == SessionState::Paused;
                self.frontend.update_controls(&session.elapsed_display(), paused);
                if !paused {
                    let epoch = session.epoch();
                    schedule(&self.events, TICK, AppEvent::ElapsedTick { epoch });
                }
            }
            Err(SessionError::Transition(e)) => log::debug!("[APP] {}", e),
            Err(SessionError::Capture(e)) => {
                self.frontend.hide_controls();
                self.surface = Surface::Entry;
                self.frontend.show_error("Recording Error", &e.to_string());
                self.frontend.show_entry();
            }
        }
    }

    fn take_session(&mut self) -> Option<SessionController> {
        match std::mem::replace(&mut self.surface, Surface::Entry) {
            Surface::Recording(session) => Some(session),
            other => {
                self.surface = other;
                None
            }
        }
    }

    async fn end_recording(&mut self) {
        let Some(mut session) = self.take_session() else {
            return;
        };
        self.frontend.hide_controls();
        // A single segment is only moved; joining several runs the concat tool.
        let merging = session.segments().len() > 1;
        if merging {
            self.frontend.begin_progress(MERGE_PROGRESS);
        }
        let outcome = session.end().await;
        if merging {
            self.frontend.end_progress();
        }
        match outcome {
            EndOutcome::Finalized(artifact) => self.show_preview(artifact),
            EndOutcome::Failed(e) => {
                self.frontend
                    .show_error("Recording Error", &format!("Recording failed: {}", e));
                self.frontend.show_entry();
            }
            EndOutcome::AlreadyFinished => self.frontend.show_entry(),
        }
    }

    async fn abandon_recording(&mut self) {
        let Some(mut session) = self.take_session() else {
            return;
        };
        session.abandon().await;
        self.frontend.hide_controls();
        self.frontend.show_entry();
    }

    async fn on_capture_failed(&mut self, epoch: u64, message: String) {
        match &self.surface {
            Surface::Recording(session) if session.epoch() == epoch => {}
            _ => {
                log::debug!("[APP] Ignoring stale capture failure (epoch {})", epoch);
                return;
            }
        }
        let Some(mut session) = self.take_session() else {
            return;
        };
        session.fail(&message).await;
        self.frontend.hide_controls();
        self.frontend
            .show_error("Recording Error", &CaptureError::Stream(message).to_string());
        self.frontend.show_entry();
    }

    // --- preview ---------------------------------------------------------

    fn show_preview(&mut self, artifact: Artifact) {
        let display_size = preview::display_size(&artifact);
        self.frontend.show_preview(&artifact, display_size);
        self.surface = Surface::Preview(artifact);
    }

    async fn save_as(&mut self, chosen: PathBuf, filter: Option<FormatFilter>) {
        let Surface::Preview(artifact) = &self.surface else {
            return;
        };
        let (destination, format) = resolve_destination(&chosen, artifact.kind, filter);
        let progress = format.progress_message();
        if let Some(message) = progress {
            self.frontend.begin_progress(message);
        }
        let result = export(self.toolchain.as_ref(), artifact, &destination, format).await;
        if progress.is_some() {
            self.frontend.end_progress();
        }
        match result {
            Ok(path) => self.frontend.show_info(
                "File saved successfully",
                &format!("Saved to: {}", path.display()),
            ),
            Err(e) => self.frontend.show_error("Error saving file", &e.to_string()),
        }
    }

    fn open_folder(&mut self) {
        let Surface::Preview(artifact) = &self.surface else {
            return;
        };
        if let Err(e) = preview::open_folder(&artifact.path, &self.config.opener) {
            self.frontend.show_error("Error opening folder", &e.to_string());
        }
    }

    async fn play(&mut self) {
        let Surface::Preview(artifact) = &self.surface else {
            return;
        };
        match preview::play(&artifact.path, &self.config.opener, &FALLBACK_PLAYERS).await {
            Ok(report) => {
                if let Some(warning) = report.warning {
                    self.frontend.show_error("Suspicious video file", &warning);
                }
                if report.outcome == PlayOutcome::NoPlayer {
                    self.frontend
                        .show_info("No suitable video player found", PLAYER_SUGGESTIONS);
                }
            }
            Err(e) => {
                let title = match e {
                    PreviewError::NotFound(_) => "Video file not found",
                    PreviewError::EmptyVideo(_) => "Invalid video file",
                    PreviewError::Spawn { .. } => "Error opening video",
                };
                self.frontend.show_error(title, &e.to_string());
            }
        }
    }

    fn close_preview(&mut self) {
        if !matches!(self.surface, Surface::Preview(_)) {
            return;
        }
        self.frontend.hide_preview();
        self.surface = Surface::Entry;
        self.frontend.show_entry();
    }
}

/// Feeds `events` to `app` until it asks to exit or every sender is gone.
pub async fn run_loop<F: Frontend>(app: &mut App<F>, events: &mut UnboundedReceiver<AppEvent>) {
    app.open();
    while let Some(event) = events.recv().await {
        if app.handle(event).await.is_break() {
            break;
        }
    }
}
