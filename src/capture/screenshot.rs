//! Still capture of a screen region through the external grabber.

use super::command::{run_tool, Toolchain};
use super::CaptureError;
use crate::artifact::{Artifact, ArtifactKind};
use crate::geometry::Rect;
use std::path::Path;

/// Grabs `region` into a timestamped PNG under `screenshots_dir`.
///
/// Blocks (asynchronously) until the grabber exits. The file must exist
/// and be non-empty for this to succeed.
pub async fn take_screenshot(
    toolchain: &dyn Toolchain,
    region: Rect,
    screenshots_dir: &Path,
) -> Result<Artifact, CaptureError> {
    std::fs::create_dir_all(screenshots_dir)?;

    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let output = screenshots_dir.join(format!("screenshot_{}.png", stamp));

    let start = std::time::Instant::now();
    let spec = toolchain.capture_still(region, &output);
    let result = run_tool(&spec)
        .await
        .map_err(|source| CaptureError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

    if !result.success() {
        let _ = std::fs::remove_file(&output);
        return Err(CaptureError::CommandFailed {
            status: result.code(),
            diagnostics: result.stderr,
        });
    }

    let size = std::fs::metadata(&output).map(|m| m.len()).unwrap_or(0);
    if size == 0 {
        let _ = std::fs::remove_file(&output);
        return Err(CaptureError::MissingOutput(output));
    }

    log::info!(
        "[CAPTURE] Screenshot {}x{} at {},{} saved to {} ({} bytes, {}ms)",
        region.width,
        region.height,
        region.x,
        region.y,
        output.display(),
        size,
        start.elapsed().as_millis()
    );

    Ok(Artifact::probe(output, ArtifactKind::Image)?)
}
