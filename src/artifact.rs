//! Finished capture results handed to the preview and export steps.

use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Image,
    Video,
}

impl ArtifactKind {
    /// Guesses the kind from a file extension. Unknown extensions are
    /// treated as images, since that is what a still capture produces.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("mp4" | "mkv" | "webm" | "mov" | "avi" | "gif") => ArtifactKind::Video,
            _ => ArtifactKind::Image,
        }
    }

    pub fn default_extension(self) -> &'static str {
        match self {
            ArtifactKind::Image => "png",
            ArtifactKind::Video => "mp4",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub path: PathBuf,
    pub kind: ArtifactKind,
    pub size_bytes: u64,
    /// Pixel dimensions, read for still images only.
    pub dimensions: Option<(u32, u32)>,
}

impl Artifact {
    /// Reads size (and image dimensions) of a file on disk.
    pub fn probe(path: impl Into<PathBuf>, kind: ArtifactKind) -> std::io::Result<Self> {
        let path = path.into();
        let size_bytes = std::fs::metadata(&path)?.len();
        let dimensions = match kind {
            ArtifactKind::Image => match image::image_dimensions(&path) {
                Ok(dims) => Some(dims),
                Err(e) => {
                    log::warn!("Could not read image dimensions of {}: {}", path.display(), e);
                    None
                }
            },
            ArtifactKind::Video => None,
        };
        Ok(Self {
            path,
            kind,
            size_bytes,
            dimensions,
        })
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}
