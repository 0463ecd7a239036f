// Thumbnail generation
//
// One JPEG poster frame per content fingerprint, extracted at 10% of the
// video to avoid black frames. Assets are content-addressed as <hash>.jpg:
// byte-identical files under different names share one thumbnail, and an
// existing asset is returned without reopening the source.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::constants::{THUMB_FORMAT, THUMB_QUALITY, THUMB_SEEK_PERCENT};
use crate::error::Result;
use crate::tools;

/// Deterministic asset path for a fingerprint.
pub fn thumbnail_path(thumbs_dir: &Path, fingerprint: &str) -> PathBuf {
    thumbs_dir.join(format!("{}.{}", fingerprint, THUMB_FORMAT))
}

/// Generate (or reuse) the thumbnail for a video.
///
/// Returns `Ok(None)` when the container cannot be opened or no frame can
/// be decoded; cataloging proceeds without a thumbnail.
pub fn generate_thumbnail(
    source_path: &Path,
    fingerprint: &str,
    duration_seconds: f64,
    thumbs_dir: &Path,
) -> Result<Option<PathBuf>> {
    let output_path = thumbnail_path(thumbs_dir, fingerprint);

    // Idempotent: reuse the cached asset without touching the source.
    if output_path.exists() {
        return Ok(Some(output_path));
    }

    std::fs::create_dir_all(thumbs_dir)?;

    // Temp file for atomic write
    let tmp_path = output_path.with_extension("tmp.jpg");

    let seek_seconds = (duration_seconds * THUMB_SEEK_PERCENT).max(0.0);
    let seek_time = format_duration(seek_seconds);

    // FFmpeg quality scale is 1-31 where 1 is best; map our 0-100 quality.
    let q_value = ((100 - THUMB_QUALITY) as f32 / 100.0 * 30.0 + 1.0) as u32;

    let mut cmd = Command::new(tools::ffmpeg_path());
    cmd.args(["-y", "-ss", &seek_time, "-i"])
        .arg(source_path)
        .args(["-vframes", "1", "-q:v", &q_value.to_string()])
        .arg(&tmp_path);

    let output = match cmd.output() {
        Ok(o) => o,
        Err(e) => {
            log::warn!("ffmpeg unavailable for {}: {}", source_path.display(), e);
            return Ok(None);
        }
    };

    if !output.status.success() {
        let _ = std::fs::remove_file(&tmp_path);
        let stderr = String::from_utf8_lossy(&output.stderr);
        log::warn!(
            "No thumbnail for {}: {}",
            source_path.display(),
            stderr.lines().last().unwrap_or("ffmpeg failed")
        );
        return Ok(None);
    }

    // A zero-byte frame means nothing was decoded at the target position.
    let size = std::fs::metadata(&tmp_path).map(|m| m.len()).unwrap_or(0);
    if size == 0 {
        let _ = std::fs::remove_file(&tmp_path);
        return Ok(None);
    }

    std::fs::rename(&tmp_path, &output_path)?;

    Ok(Some(output_path))
}

/// Format seconds as HH:MM:SS.mmm for ffmpeg.
fn format_duration(seconds: f64) -> String {
    let hours = (seconds / 3600.0) as u32;
    let minutes = ((seconds % 3600.0) / 60.0) as u32;
    let secs = seconds % 60.0;
    format!("{:02}:{:02}:{:06.3}", hours, minutes, secs)
}
