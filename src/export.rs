//! "Save as" for a finished artifact: plain copy, video to GIF, or image
//! to JPEG.
//!
//! Results are written to a temporary sibling of the destination and
//! renamed into place only after they check out, so a failed export never
//! leaves a partial file where the user asked for one.

use crate::artifact::{Artifact, ArtifactKind};
use crate::capture::{run_tool, CommandSpec, Toolchain};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// File type picked in the save dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatFilter {
    Mp4,
    Gif,
    Png,
    Jpeg,
    All,
}

impl FormatFilter {
    /// Extension forced by this filter; `None` for `All`.
    pub fn extension(self) -> Option<&'static str> {
        match self {
            FormatFilter::Mp4 => Some("mp4"),
            FormatFilter::Gif => Some("gif"),
            FormatFilter::Png => Some("png"),
            FormatFilter::Jpeg => Some("jpg"),
            FormatFilter::All => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FormatFilter::Mp4 => "MP4 files",
            FormatFilter::Gif => "GIF Animation",
            FormatFilter::Png => "PNG Image",
            FormatFilter::Jpeg => "JPEG Image",
            FormatFilter::All => "All files",
        }
    }

    /// Filters offered for an artifact of `kind`, in dialog order.
    pub fn offered_for(kind: ArtifactKind) -> &'static [FormatFilter] {
        match kind {
            ArtifactKind::Video => &[FormatFilter::Mp4, FormatFilter::Gif, FormatFilter::All],
            ArtifactKind::Image => &[FormatFilter::Png, FormatFilter::Jpeg, FormatFilter::All],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown format '{0}' (expected mp4, gif, png, jpg or all)")]
pub struct UnknownFormat(pub String);

impl FromStr for FormatFilter {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp4" => Ok(FormatFilter::Mp4),
            "gif" => Ok(FormatFilter::Gif),
            "png" => Ok(FormatFilter::Png),
            "jpg" | "jpeg" => Ok(FormatFilter::Jpeg),
            "all" | "*" => Ok(FormatFilter::All),
            other => Err(UnknownFormat(other.to_string())),
        }
    }
}

/// What the export actually does with the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Copy,
    Gif,
    Jpeg,
}

impl ExportFormat {
    /// Message shown while a conversion runs; plain copies show none.
    pub fn progress_message(self) -> Option<&'static str> {
        match self {
            ExportFormat::Copy => None,
            ExportFormat::Gif => Some("Converting to GIF..."),
            ExportFormat::Jpeg => Some("Converting image format..."),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("{0}")]
    Source(String),

    #[error(
        "{tool} error (code {}): {diagnostics}",
        status.map_or("unknown".to_string(), |c| c.to_string())
    )]
    Conversion {
        tool: String,
        status: Option<i32>,
        diagnostics: String,
    },

    #[error("Output file was not created at: {}", .0.display())]
    Verification(PathBuf),

    #[error("Created file is empty (0 bytes): {}", .0.display())]
    EmptyOutput(PathBuf),

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Final destination path and the operation needed to produce it.
///
/// A specific filter replaces whatever extension the user typed. With
/// `All` (or no filter) the typed extension is kept, or the kind's default
/// is appended when there is none.
pub fn resolve_destination(
    chosen: &Path,
    kind: ArtifactKind,
    filter: Option<FormatFilter>,
) -> (PathBuf, ExportFormat) {
    let destination = match filter.and_then(FormatFilter::extension) {
        Some(ext) => chosen.with_extension(ext),
        None if chosen.extension().is_none() => chosen.with_extension(kind.default_extension()),
        None => chosen.to_path_buf(),
    };

    let format = match (kind, extension_of(&destination).as_deref()) {
        (ArtifactKind::Video, Some("gif")) => ExportFormat::Gif,
        (ArtifactKind::Image, Some("jpg" | "jpeg")) => ExportFormat::Jpeg,
        _ => ExportFormat::Copy,
    };
    (destination, format)
}

/// Temporary sibling: `{stem}.partial-{pid}.{ext}` next to `destination`.
/// The extension is kept so converters pick the right output format.
pub fn partial_path(destination: &Path) -> PathBuf {
    let stem = destination
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "export".to_string());
    let name = match destination.extension() {
        Some(ext) => format!(
            "{}.partial-{}.{}",
            stem,
            std::process::id(),
            ext.to_string_lossy()
        ),
        None => format!("{}.partial-{}", stem, std::process::id()),
    };
    destination.with_file_name(name)
}

/// Exports `artifact` to `destination` using `format`, as resolved by
/// [`resolve_destination`]. Returns the written path.
pub async fn export(
    toolchain: &dyn Toolchain,
    artifact: &Artifact,
    destination: &Path,
    format: ExportFormat,
) -> Result<PathBuf, ExportError> {
    let source = &artifact.path;
    let source_size = match std::fs::metadata(source) {
        Ok(meta) => meta.len(),
        Err(_) => {
            return Err(ExportError::Source(format!(
                "Source file does not exist: {}",
                source.display()
            )))
        }
    };
    if source_size == 0 {
        return Err(ExportError::Source(format!(
            "Source file is empty (0 bytes): {}",
            source.display()
        )));
    }

    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    log::info!(
        "[EXPORT] {:?} {} ({} bytes) -> {}",
        format,
        source.display(),
        source_size,
        destination.display()
    );

    let start = std::time::Instant::now();
    let partial = partial_path(destination);
    let result = write_partial(toolchain, source, &partial, format).await;
    let result = result.and_then(|()| verify_output(&partial));

    match result {
        Ok(size) => {
            if let Err(e) = std::fs::rename(&partial, destination) {
                let _ = std::fs::remove_file(&partial);
                return Err(e.into());
            }
            log::info!(
                "[EXPORT] Saved {} ({} bytes) in {}ms",
                destination.display(),
                size,
                start.elapsed().as_millis()
            );
            Ok(destination.to_path_buf())
        }
        Err(e) => {
            let _ = std::fs::remove_file(&partial);
            log::error!("[EXPORT] Failed: {}", e);
            Err(e)
        }
    }
}

/// Resolves the destination for `chosen` and exports to it.
pub async fn save_as(
    toolchain: &dyn Toolchain,
    artifact: &Artifact,
    chosen: &Path,
    filter: Option<FormatFilter>,
) -> Result<PathBuf, ExportError> {
    let (destination, format) = resolve_destination(chosen, artifact.kind, filter);
    export(toolchain, artifact, &destination, format).await
}

async fn write_partial(
    toolchain: &dyn Toolchain,
    source: &Path,
    partial: &Path,
    format: ExportFormat,
) -> Result<(), ExportError> {
    let spec = match format {
        ExportFormat::Copy => {
            std::fs::copy(source, partial)?;
            return Ok(());
        }
        ExportFormat::Gif => toolchain.video_to_gif(source, partial),
        ExportFormat::Jpeg => toolchain.image_to_jpeg(source, partial),
    };
    run_conversion(&spec).await
}

async fn run_conversion(spec: &CommandSpec) -> Result<(), ExportError> {
    let output = run_tool(spec).await.map_err(|source| ExportError::Spawn {
        program: spec.program.clone(),
        source,
    })?;
    if !output.success() {
        return Err(ExportError::Conversion {
            tool: spec.program.clone(),
            status: output.code(),
            diagnostics: output.stderr,
        });
    }
    Ok(())
}

fn verify_output(path: &Path) -> Result<u64, ExportError> {
    match std::fs::metadata(path) {
        Err(_) => Err(ExportError::Verification(path.to_path_buf())),
        Ok(meta) if meta.len() == 0 => Err(ExportError::EmptyOutput(path.to_path_buf())),
        Ok(meta) => Ok(meta.len()),
    }
}
