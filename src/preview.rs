//! Actions on the result surface: play a recording, open the containing
//! folder, size a still for display.

use crate::artifact::Artifact;
use crate::geometry::fit_within;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Largest size a still is shown at in the preview.
pub const PREVIEW_MAX_WIDTH: u32 = 780;
pub const PREVIEW_MAX_HEIGHT: u32 = 500;

/// Videos smaller than this probably did not record anything useful.
pub const SMALL_VIDEO_BYTES: u64 = 1000;

/// How long the desktop opener gets to report failure before we assume
/// it is busy launching something.
pub const OPENER_WAIT: Duration = Duration::from_secs(3);

pub const FALLBACK_PLAYERS: [&str; 4] = ["vlc", "mpv", "totem", "celluloid"];

pub const PLAYER_SUGGESTIONS: &str = "Please install one of the following video players to view MP4 files:\n\
    \n  - VLC Media Player: sudo apt install vlc\
    \n  - MPV: sudo apt install mpv\
    \n  - Totem (GNOME Videos): sudo apt install totem\
    \n  - Celluloid: sudo apt install celluloid";

#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    #[error("The file {} does not exist.", .0.display())]
    NotFound(PathBuf),

    #[error("The video file is empty (0 bytes). The recording may have failed.")]
    EmptyVideo(PathBuf),

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayOutcome {
    /// `program` accepted the file.
    Opened(String),
    /// The opener was still running when the wait expired; it is left to
    /// finish on its own.
    Launching(String),
    /// Neither the opener nor any known player could be used.
    NoPlayer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayReport {
    pub outcome: PlayOutcome,
    /// Shown to the user before playback, which still goes ahead.
    pub warning: Option<String>,
}

/// Opens a recording with the desktop opener, falling back to the first
/// installed player from `players`.
pub async fn play(path: &Path, opener: &str, players: &[&str]) -> Result<PlayReport, PreviewError> {
    let size = std::fs::metadata(path)
        .map_err(|_| PreviewError::NotFound(path.to_path_buf()))?
        .len();
    if size == 0 {
        return Err(PreviewError::EmptyVideo(path.to_path_buf()));
    }
    let warning = (size < SMALL_VIDEO_BYTES).then(|| {
        log::warn!("[PREVIEW] Video file is very small ({} bytes)", size);
        format!(
            "The video file is suspiciously small ({} bytes). It may not play correctly.",
            size
        )
    });

    let outcome = match try_opener(path, opener).await {
        Some(outcome) => outcome,
        None => launch_fallback(path, players),
    };
    log::info!("[PREVIEW] Play {}: {:?}", path.display(), outcome);
    Ok(PlayReport { outcome, warning })
}

async fn try_opener(path: &Path, opener: &str) -> Option<PlayOutcome> {
    let child = Command::new(opener)
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn();
    let child = match child {
        Ok(child) => child,
        Err(e) => {
            log::warn!("[PREVIEW] Could not start {}: {}", opener, e);
            return None;
        }
    };

    match tokio::time::timeout(OPENER_WAIT, child.wait_with_output()).await {
        Ok(Ok(output)) if output.status.success() => Some(PlayOutcome::Opened(opener.to_string())),
        Ok(Ok(output)) => {
            log::warn!(
                "[PREVIEW] {} failed with {}: {}",
                opener,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            None
        }
        Ok(Err(e)) => {
            log::warn!("[PREVIEW] Waiting for {} failed: {}", opener, e);
            None
        }
        Err(_) => Some(PlayOutcome::Launching(opener.to_string())),
    }
}

fn launch_fallback(path: &Path, players: &[&str]) -> PlayOutcome {
    for player in players {
        if which::which(player).is_err() {
            log::debug!("[PREVIEW] {} not installed", player);
            continue;
        }
        match Command::new(player)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(_) => return PlayOutcome::Opened(player.to_string()),
            Err(e) => log::warn!("[PREVIEW] Could not start {}: {}", player, e),
        }
    }
    PlayOutcome::NoPlayer
}

/// Opens the directory containing `path` in the desktop file manager.
pub fn open_folder(path: &Path, opener: &str) -> Result<PathBuf, PreviewError> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    let folder = absolute
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    Command::new(opener)
        .arg(&folder)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| PreviewError::Spawn {
            program: opener.to_string(),
            source,
        })?;
    log::info!("[PREVIEW] Opened folder {}", folder.display());
    Ok(folder)
}

/// Display size of a still in the preview, never larger than the file.
pub fn display_size(artifact: &Artifact) -> Option<(u32, u32)> {
    artifact
        .dimensions
        .map(|(w, h)| fit_within(w, h, PREVIEW_MAX_WIDTH, PREVIEW_MAX_HEIGHT))
}
