//! Command-line entry: interactive console session, or one-shot
//! screenshot / record / export.

use crate::app::{run_loop, App};
use crate::artifact::{Artifact, ArtifactKind};
use crate::capture::{take_screenshot, CaptureError, Toolchain};
use crate::config::AppConfig;
use crate::console::{self, parse_region, ConsoleFrontend};
use crate::event::AppEvent;
use crate::export::{save_as, ExportError, FormatFilter};
use crate::frontend::Frontend;
use crate::geometry::Rect;
use crate::preview;
use crate::selection::SelectionMode;
use crate::session::{EndOutcome, FinalizeError, SessionController, SessionError};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(name = "areacast")]
#[command(about = "Screen region capture: screenshots and pausable recordings")]
#[command(version)]
pub struct Cli {
    /// How regions are selected (overrides AREACAST_SELECTION_MODE)
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Print one JSON object per line instead of text
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Drag,
    TwoClick,
}

impl From<ModeArg> for SelectionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Drag => SelectionMode::Drag,
            ModeArg::TwoClick => SelectionMode::TwoClick,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Capture a region to screenshots/
    Screenshot {
        /// X,Y,W,H in screen pixels
        #[arg(long, value_parser = parse_region)]
        region: Rect,
    },

    /// Record a region to videos/
    Record {
        /// X,Y,W,H in screen pixels
        #[arg(long, value_parser = parse_region)]
        region: Rect,

        /// Stop after this many seconds instead of waiting for Enter
        #[arg(long)]
        seconds: Option<u64>,
    },

    /// Save a capture under a new name, converting if the extension asks for it
    Export {
        source: PathBuf,
        destination: PathBuf,

        /// mp4, gif, png, jpg or all
        #[arg(long)]
        format: Option<FormatFilter>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Recording failed: {0}")]
    Finalize(#[from] FinalizeError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("Cannot read {}: {source}", path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Runs whatever `cli` asks for. Without a subcommand this is the
/// interactive console session.
pub async fn execute(cli: Cli, config: AppConfig) -> Result<(), CliError> {
    let toolchain: Arc<dyn Toolchain> = Arc::new(config.toolchain());
    let mut frontend = ConsoleFrontend::stdout(cli.json);

    match cli.command {
        None => {
            interactive(config, toolchain, frontend).await;
            Ok(())
        }
        Some(Command::Screenshot { region }) => {
            let artifact =
                take_screenshot(toolchain.as_ref(), region, &config.screenshots_dir()).await?;
            frontend.show_preview(&artifact, preview::display_size(&artifact));
            Ok(())
        }
        Some(Command::Record { region, seconds }) => {
            let artifact = record_once(&config, toolchain, region, seconds, &mut frontend).await?;
            frontend.show_preview(&artifact, None);
            Ok(())
        }
        Some(Command::Export {
            source,
            destination,
            format,
        }) => {
            let kind = ArtifactKind::from_path(&source);
            let artifact = Artifact::probe(&source, kind).map_err(|e| CliError::Source {
                path: source.clone(),
                source: e,
            })?;
            let written = save_as(toolchain.as_ref(), &artifact, &destination, format).await?;
            frontend.show_info(
                "File saved successfully",
                &format!("Saved to: {}", written.display()),
            );
            Ok(())
        }
    }
}

async fn interactive(
    config: AppConfig,
    toolchain: Arc<dyn Toolchain>,
    frontend: ConsoleFrontend,
) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let reader = console::spawn_stdin_reader(tx.clone(), config.selection_mode);
    let mut app = App::new(config, toolchain, frontend, tx);
    run_loop(&mut app, &mut rx).await;
    reader.abort();
}

/// Records `region` without the selector: countdown, record until the
/// time is up (or Enter), merge.
async fn record_once<F: Frontend>(
    config: &AppConfig,
    toolchain: Arc<dyn Toolchain>,
    region: Rect,
    seconds: Option<u64>,
    frontend: &mut F,
) -> Result<Artifact, CliError> {
    for remaining in (1..=config.countdown_secs).rev() {
        frontend.show_countdown(remaining);
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut session = SessionController::new(
        region,
        toolchain,
        config.process_options(),
        config.session_paths(),
        tx,
    );
    session.start().await?;
    frontend.show_controls((region.x, region.y), region);

    let stop = async {
        match seconds {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => {
                let mut line = String::new();
                let _ = BufReader::new(tokio::io::stdin()).read_line(&mut line).await;
            }
        }
    };

    tokio::select! {
        _ = stop => {}
        Some(AppEvent::CaptureFailed { message, .. }) = rx.recv() => {
            session.fail(&message).await;
            return Err(CaptureError::Stream(message).into());
        }
    }

    frontend.update_controls(&session.elapsed_display(), false);
    frontend.hide_controls();
    match session.end().await {
        EndOutcome::Finalized(artifact) => Ok(artifact),
        EndOutcome::Failed(e) => Err(e.into()),
        EndOutcome::AlreadyFinished => Err(FinalizeError::NoSegments.into()),
    }
}
