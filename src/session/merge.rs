//! Turns a session's committed segments into one output file.
//!
//! One segment is moved into place. Several are stream-copied together
//! with the toolchain's concat step, driven by a manifest file. Either
//! way the result must exist and be non-empty before it is reported.

use super::segment::{file_len, Segment, SessionPaths};
use super::FinalizeError;
use crate::artifact::{Artifact, ArtifactKind};
use crate::capture::{run_tool, Toolchain};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

pub async fn merge_segments(
    toolchain: &dyn Toolchain,
    segments: &[Segment],
    paths: &SessionPaths,
    now: DateTime<Local>,
) -> Result<Artifact, FinalizeError> {
    std::fs::create_dir_all(&paths.videos_dir)?;
    let output = paths.output_path(now);

    let present: Vec<&Segment> = segments.iter().filter(|s| s.path.exists()).collect();
    log::info!(
        "[MERGE] {} of {} segments on disk, output {}",
        present.len(),
        segments.len(),
        output.display()
    );

    match present.as_slice() {
        [] => return Err(FinalizeError::NoSegments),
        [only] => move_single(&only.path, &output)?,
        many => concat_many(toolchain, many, paths, now, &output).await?,
    }

    verify_output(&output)?;
    Ok(Artifact::probe(output, ArtifactKind::Video)?)
}

fn move_single(segment: &Path, output: &Path) -> Result<(), FinalizeError> {
    let size = file_len(segment).unwrap_or(0);
    if size == 0 {
        log::warn!("[MERGE] Segment is empty (0 bytes): {}", segment.display());
        let _ = std::fs::remove_file(segment);
        return Err(FinalizeError::EmptyOutput(segment.to_path_buf()));
    }

    if let Err(e) = std::fs::rename(segment, output) {
        // Typically EXDEV when the work dir and videos dir are on
        // different filesystems.
        log::warn!("[MERGE] Rename failed ({}), copying instead", e);
        std::fs::copy(segment, output)?;
        std::fs::remove_file(segment)?;
    }
    log::info!("[MERGE] Single segment ({} bytes) moved to {}", size, output.display());
    Ok(())
}

async fn concat_many(
    toolchain: &dyn Toolchain,
    segments: &[&Segment],
    paths: &SessionPaths,
    now: DateTime<Local>,
    output: &Path,
) -> Result<(), FinalizeError> {
    let manifest = paths.manifest_path(now);
    let body = build_manifest(segments.iter().map(|s| s.path.as_path()))?;
    std::fs::write(&manifest, body)?;

    let start = std::time::Instant::now();
    let spec = toolchain.concat(&manifest, output);
    let result = run_tool(&spec).await;

    // Segments and manifest go away whatever the outcome.
    for segment in segments {
        if let Err(e) = std::fs::remove_file(&segment.path) {
            log::warn!("[MERGE] Could not remove {}: {}", segment.path.display(), e);
        }
    }
    if let Err(e) = std::fs::remove_file(&manifest) {
        log::warn!("[MERGE] Could not remove manifest {}: {}", manifest.display(), e);
    }

    let result = result.map_err(|source| FinalizeError::Spawn {
        program: spec.program.clone(),
        source,
    })?;
    if !result.success() {
        let _ = std::fs::remove_file(output);
        return Err(FinalizeError::Merge {
            status: result.code(),
            diagnostics: result.stderr,
        });
    }

    log::info!(
        "[MERGE] Concatenated {} segments in {}ms",
        segments.len(),
        start.elapsed().as_millis()
    );
    Ok(())
}

/// Concat-demuxer manifest: one `file '<absolute path>'` line per segment,
/// in recording order.
pub fn build_manifest<'a>(
    segments: impl IntoIterator<Item = &'a Path>,
) -> std::io::Result<String> {
    let cwd = std::env::current_dir()?;
    let mut body = String::new();
    for path in segments {
        let absolute: PathBuf = if path.is_absolute() {
            path.to_path_buf()
        } else {
            cwd.join(path)
        };
        body.push_str(&format!(
            "file '{}'\n",
            absolute.to_string_lossy().replace('\'', r"'\''")
        ));
    }
    Ok(body)
}

fn verify_output(output: &Path) -> Result<(), FinalizeError> {
    match file_len(output) {
        None => Err(FinalizeError::Verification(output.to_path_buf())),
        Some(0) => {
            let _ = std::fs::remove_file(output);
            Err(FinalizeError::EmptyOutput(output.to_path_buf()))
        }
        Some(size) => {
            log::info!("[MERGE] Final output {} ({} bytes)", output.display(), size);
            Ok(())
        }
    }
}
