// Scan orchestration
//
// Walks a directory tree, runs fingerprint -> metadata -> thumbnail for
// each video file not already cataloged by exact path, and inserts one
// record per file. Each file's insert is an independent commit, so a
// cancelled or failed scan leaves previously committed rows valid.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

use rusqlite::Connection;
use serde::Serialize;
use walkdir::WalkDir;

use crate::config::LibraryConfig;
use crate::constants::VIDEO_EXTENSIONS;
use crate::db::schema::{self, NewVideo};
use crate::error::{ClipdexError, Result};
use crate::{hash, metadata, thumbs};

/// Check if a file has a recognized video extension (case-insensitive)
pub fn is_video_file(path: &Path) -> bool {
    let ext = match path.extension().and_then(|e| e.to_str()) {
        Some(e) => e.to_lowercase(),
        None => return false,
    };
    VIDEO_EXTENSIONS.contains(&ext.as_str())
}

/// Discover all video files under a root directory
pub fn discover_videos(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file() && is_video_file(path) {
            files.push(path.to_path_buf());
        }
    }

    // Sort by path for consistent ordering
    files.sort();

    Ok(files)
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub total: usize,
    pub added: usize,
    pub skipped: usize,
    /// (path, error) per file that could not be cataloged.
    pub failed: Vec<(String, String)>,
    pub cancelled: bool,
}

/// Progress and completion events delivered to the initiating interface.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    Started { total: usize },
    FileAdded { path: PathBuf, video_id: i64, index: usize, total: usize },
    FileSkipped { path: PathBuf, index: usize, total: usize },
    FileFailed { path: PathBuf, error: String, index: usize, total: usize },
    /// Sent exactly once, carrying the final report.
    Completed(ScanReport),
}

fn emit(events: Option<&Sender<ScanEvent>>, event: ScanEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event);
    }
}

/// Run a scan on the caller's thread.
///
/// The cancel flag is checked between files; progress events are optional.
/// Completion is not emitted here -- the background wrapper owns that
/// signal so it fires exactly once.
pub fn scan_directory(
    conn: &Connection,
    config: &LibraryConfig,
    root: &Path,
    cancel_flag: Option<&AtomicBool>,
    events: Option<&Sender<ScanEvent>>,
) -> Result<ScanReport> {
    let root = root
        .canonicalize()
        .map_err(|_| ClipdexError::InvalidPath(format!("not a directory: {}", root.display())))?;
    if !root.is_dir() {
        return Err(ClipdexError::InvalidPath(format!(
            "not a directory: {}",
            root.display()
        )));
    }

    let files = discover_videos(&root)?;
    let mut report = ScanReport {
        total: files.len(),
        ..Default::default()
    };

    emit(events, ScanEvent::Started { total: files.len() });

    for (idx, path) in files.iter().enumerate() {
        if let Some(flag) = cancel_flag {
            if flag.load(Ordering::Relaxed) {
                log::info!("Scan cancelled after {} of {} files", idx, report.total);
                report.cancelled = true;
                break;
            }
        }

        let index = idx + 1;
        let total = report.total;

        match process_file(conn, config, path) {
            Ok(Some(video_id)) => {
                report.added += 1;
                emit(events, ScanEvent::FileAdded { path: path.clone(), video_id, index, total });
            }
            Ok(None) => {
                report.skipped += 1;
                emit(events, ScanEvent::FileSkipped { path: path.clone(), index, total });
            }
            Err(e) => {
                // One file's failure never aborts the rest of the scan.
                log::warn!("Failed to catalog {}: {}", path.display(), e);
                report.failed.push((path.display().to_string(), e.to_string()));
                emit(events, ScanEvent::FileFailed {
                    path: path.clone(),
                    error: e.to_string(),
                    index,
                    total,
                });
            }
        }
    }

    Ok(report)
}

/// Catalog a single file. Returns None when the path is already present.
fn process_file(conn: &Connection, config: &LibraryConfig, path: &Path) -> Result<Option<i64>> {
    let file_path = path.to_string_lossy().to_string();

    if schema::video_exists(conn, &file_path)? {
        log::debug!("Skipping already cataloged file: {}", file_path);
        return Ok(None);
    }

    let fingerprint = hash::compute_fingerprint(path)?;
    let meta = metadata::extract(path)?;
    let thumbnail =
        thumbs::generate_thumbnail(path, &fingerprint, meta.duration_seconds, &config.thumbs_dir)?;

    // Same content under a different path still gets its own row; the
    // duplication is surfaced later via duplicate_groups.
    if let Some(existing) = schema::find_by_fingerprint(conn, &fingerprint)?.first() {
        log::info!(
            "Duplicate content: {} matches {}",
            file_path,
            existing.file_path
        );
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| ClipdexError::InvalidPath(file_path.clone()))?;

    let id = schema::insert_video(
        conn,
        &NewVideo {
            file_path,
            file_name,
            file_size: meta.size_bytes,
            mod_date: meta.mod_date,
            duration: meta.duration_seconds,
            thumbnail_path: thumbnail.map(|p| p.to_string_lossy().to_string()),
            hash: Some(fingerprint),
        },
    )?;

    Ok(Some(id))
}

/// Handle to a scan running on a background thread.
///
/// The interface layer consumes progress from `events()` on its own
/// execution context and may request cancellation at any point; partial
/// results already committed remain valid.
pub struct ScanHandle {
    cancel: Arc<AtomicBool>,
    events: Receiver<ScanEvent>,
    join: JoinHandle<Result<ScanReport>>,
}

impl ScanHandle {
    /// Request a clean stop; honored between files.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn events(&self) -> &Receiver<ScanEvent> {
        &self.events
    }

    /// Block until the scan finishes and return the final report.
    pub fn wait(self) -> Result<ScanReport> {
        match self.join.join() {
            Ok(result) => result,
            Err(_) => Err(ClipdexError::Other("scan thread panicked".to_string())),
        }
    }
}

/// Start a scan on a background thread with its own catalog connection,
/// keeping the initiating interface responsive. The `Completed` event is
/// delivered exactly once, carrying the count of newly added records.
pub fn spawn_scan(config: LibraryConfig, root: PathBuf) -> ScanHandle {
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    let (tx, rx) = mpsc::channel();

    let join = std::thread::spawn(move || {
        let result = crate::db::open_db(&config.db_path)
            .map_err(ClipdexError::from)
            .and_then(|conn| scan_directory(&conn, &config, &root, Some(&flag), Some(&tx)));

        match result {
            Ok(report) => {
                let _ = tx.send(ScanEvent::Completed(report.clone()));
                Ok(report)
            }
            Err(e) => {
                let report = ScanReport {
                    failed: vec![(root.display().to_string(), e.to_string())],
                    ..Default::default()
                };
                let _ = tx.send(ScanEvent::Completed(report));
                Err(e)
            }
        }
    });

    ScanHandle {
        cancel,
        events: rx,
        join,
    }
}
