//! areacast: screen region capture.
//!
//! Wires together:
//! - Region selection (selection/, geometry.rs)
//! - External capture tools and their processes (capture/)
//! - Pausable, segmented recording sessions (session/)
//! - Save-as and conversion (export.rs), play / open folder (preview.rs)
//! - The single-owner UI loop (app.rs) behind a `Frontend` (console.rs)

pub mod app;
pub mod artifact;
pub mod capture;
pub mod cli;
pub mod config;
pub mod console;
pub mod event;
pub mod export;
pub mod frontend;
pub mod geometry;
pub mod preview;
pub mod selection;
pub mod session;

use clap::Parser;

/// Entry point, called by the binary.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = cli::Cli::parse();
    let mut config = config::AppConfig::load()?;
    if let Some(mode) = cli.mode {
        config.selection_mode = mode.into();
    }

    log::info!(
        "areacast starting up (output {}, {:?} selection)",
        config.output_dir.display(),
        config.selection_mode
    );
    let missing = config.check_tools();
    if !missing.is_empty() {
        log::warn!("Missing tools: {}", missing.join(", "));
    }

    // One thread: the app, timers, monitors and the stdin reader all
    // interleave on it, and only the app touches app state.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(cli::execute(cli, config))?;
    Ok(())
}
