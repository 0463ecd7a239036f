// Metadata extraction: filesystem stats plus ffprobe duration
//
// Policy asymmetry with the hasher (by contract): an unreadable container
// degrades to duration 0 and the file is still cataloged, while filesystem
// errors (stat failure, permission denied) propagate and the file is skipped.

use std::path::Path;
use std::process::Command;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::Result;
use crate::tools;

#[derive(Debug, Clone, Default)]
pub struct VideoMetadata {
    pub size_bytes: i64,
    /// Modification timestamp as sortable `%Y-%m-%d %H:%M:%S` UTC text.
    pub mod_date: String,
    /// Seconds; 0 when the container could not be read.
    pub duration_seconds: f64,
}

#[derive(Debug, Deserialize)]
struct FFprobeOutput {
    streams: Option<Vec<FFprobeStream>>,
    format: Option<FFprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FFprobeStream {
    codec_type: Option<String>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FFprobeFormat {
    duration: Option<String>,
}

/// Extract size, modification timestamp and duration for a video file.
pub fn extract(path: &Path) -> Result<VideoMetadata> {
    let stat = std::fs::metadata(path)?;
    let modified = stat.modified()?;
    let mod_date = DateTime::<Utc>::from(modified)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();

    let duration_seconds = probe_duration(path).unwrap_or(0.0);

    Ok(VideoMetadata {
        size_bytes: stat.len() as i64,
        mod_date,
        duration_seconds,
    })
}

/// Probe the container duration via ffprobe. Returns None when the backend
/// cannot open the container, reports a non-positive frame rate, or yields
/// no positive duration.
fn probe_duration(path: &Path) -> Option<f64> {
    let output = Command::new(tools::ffprobe_path())
        .args([
            "-v", "quiet",
            "-print_format", "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let probe: FFprobeOutput = serde_json::from_slice(&output.stdout).ok()?;

    let mut duration = None;
    if let Some(streams) = &probe.streams {
        for stream in streams {
            if stream.codec_type.as_deref() != Some("video") {
                continue;
            }
            // A reported non-positive frame rate means the stream is not
            // decodable; treat the duration as unknown.
            if let Some(fps) = parse_frame_rate(stream.r_frame_rate.as_deref()) {
                if fps <= 0.0 {
                    return None;
                }
            }
            if duration.is_none() {
                duration = parse_seconds(stream.duration.as_deref());
            }
        }
    }

    if duration.is_none() {
        duration = probe
            .format
            .and_then(|f| parse_seconds(f.duration.as_deref()));
    }

    duration.filter(|d| *d > 0.0)
}

/// Parse frame rate string like "30000/1001" to f64
fn parse_frame_rate(rate_str: Option<&str>) -> Option<f64> {
    let rate_str = rate_str?;
    if let Some((num, den)) = rate_str.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    rate_str.parse().ok()
}

fn parse_seconds(duration_str: Option<&str>) -> Option<f64> {
    duration_str?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_extract_stat_fields() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("clip.mp4");
        std::fs::write(&path, b"not really a video").unwrap();

        let meta = extract(&path).unwrap();
        assert_eq!(meta.size_bytes, 18);
        // Timestamp is formatted, sortable text
        assert_eq!(meta.mod_date.len(), 19);
        assert!(meta.mod_date.contains('-') && meta.mod_date.contains(':'));
    }

    #[test]
    fn test_unreadable_container_degrades_to_zero_duration() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("garbage.mp4");
        std::fs::write(&path, b"\x00\x01\x02 garbage bytes").unwrap();

        // ffprobe either fails on this content or is not installed; both
        // degrade to duration 0 rather than an error.
        let meta = extract(&path).unwrap();
        assert_eq!(meta.duration_seconds, 0.0);
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(extract(Path::new("/nonexistent/clip.mp4")).is_err());
    }

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate(Some("30/1")), Some(30.0));
        assert_eq!(parse_frame_rate(Some("30000/1001")).map(|f| f.round()), Some(30.0));
        assert_eq!(parse_frame_rate(Some("0/0")), None);
        assert_eq!(parse_frame_rate(Some("25")), Some(25.0));
        assert_eq!(parse_frame_rate(None), None);
    }
}
