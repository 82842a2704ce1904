use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

/// One stretch of recording between a start/resume and a pause/end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub path: PathBuf,
    pub created_at: DateTime<Local>,
}

/// Where a session writes temporary and final files.
#[derive(Debug, Clone)]
pub struct SessionPaths {
    /// Segment files and the concat manifest.
    pub work_dir: PathBuf,
    /// Final recordings.
    pub videos_dir: PathBuf,
}

impl SessionPaths {
    pub fn new(work_dir: impl Into<PathBuf>, videos_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            videos_dir: videos_dir.into(),
        }
    }

    /// Fresh segment path. `seq` never repeats within a session, so two
    /// segments started in the same second still get distinct files.
    pub fn segment_path(&self, now: DateTime<Local>, seq: u32) -> PathBuf {
        self.work_dir.join(format!(
            "temp_segment_{}_{:03}.mp4",
            now.format("%Y%m%d_%H%M%S"),
            seq
        ))
    }

    pub fn manifest_path(&self, now: DateTime<Local>) -> PathBuf {
        self.work_dir
            .join(format!("file_list_{}.txt", now.format("%Y%m%d_%H%M%S")))
    }

    pub fn output_path(&self, now: DateTime<Local>) -> PathBuf {
        self.videos_dir
            .join(format!("recording_{}.mp4", now.format("%Y%m%d_%H%M%S")))
    }
}

/// Removes segment files that exist, logging failures. Returns how many
/// files were deleted.
pub fn remove_segment_files(segments: &[Segment]) -> usize {
    segments
        .iter()
        .filter(|s| s.path.exists())
        .filter(|s| match std::fs::remove_file(&s.path) {
            Ok(()) => {
                log::debug!("[SESSION] Removed segment {}", s.path.display());
                true
            }
            Err(e) => {
                log::warn!("[SESSION] Could not remove {}: {}", s.path.display(), e);
                false
            }
        })
        .count()
}

pub fn file_len(path: &Path) -> Option<u64> {
    std::fs::metadata(path).ok().map(|m| m.len())
}
