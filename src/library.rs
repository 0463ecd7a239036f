// Library facade
//
// The surface consumed by presentation layers: scan, search, list, rename,
// duplicate grouping, thumbnails, tags, and stale-record reconciliation.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

use crate::config::LibraryConfig;
use crate::db::{self, schema};
use crate::db::schema::{DuplicateGroup, SearchMode, Tag, VideoRecord};
use crate::error::{ClipdexError, Result};
use crate::scan::{self, ScanHandle, ScanReport};

pub struct Library {
    config: LibraryConfig,
    conn: Connection,
}

impl Library {
    /// Open (or create) the catalog described by the config.
    pub fn open(config: LibraryConfig) -> Result<Self> {
        let conn = db::open_db(&config.db_path).map_err(ClipdexError::from)?;
        Ok(Self { config, conn })
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    /// Scan a directory on the calling thread.
    pub fn scan(&self, root: &Path) -> Result<ScanReport> {
        scan::scan_directory(&self.conn, &self.config, root, None, None)
    }

    /// Scan a directory on a background thread; the returned handle carries
    /// progress events and a cancellation switch.
    pub fn spawn_scan(&self, root: PathBuf) -> ScanHandle {
        scan::spawn_scan(self.config.clone(), root)
    }

    pub fn list_all(&self) -> Result<Vec<VideoRecord>> {
        schema::list_videos(&self.conn)
    }

    pub fn search(&self, query: &str, mode: SearchMode) -> Result<Vec<VideoRecord>> {
        schema::search_videos(&self.conn, query, mode)
    }

    pub fn duplicate_groups(&self) -> Result<Vec<DuplicateGroup>> {
        schema::duplicate_groups(&self.conn)
    }

    pub fn get(&self, id: i64) -> Result<VideoRecord> {
        schema::get_video(&self.conn, id)?
            .ok_or_else(|| ClipdexError::NotFound(format!("video id {}", id)))
    }

    /// Rename the underlying file and update the catalog.
    ///
    /// Sequencing: OS-level rename first; on success, catalog update. If
    /// the OS rename fails the catalog is left untouched and the error is
    /// surfaced. The old extension is preserved when the new name omits one.
    pub fn rename(&self, id: i64, new_name: &str) -> Result<VideoRecord> {
        let record = self.get(id)?;
        let old_path = PathBuf::from(&record.file_path);
        let parent = old_path
            .parent()
            .ok_or_else(|| ClipdexError::InvalidPath(record.file_path.clone()))?;

        let mut name = new_name.trim().to_string();
        if name.is_empty() {
            return Err(ClipdexError::InvalidPath("empty file name".to_string()));
        }
        if Path::new(&name).extension().is_none() {
            if let Some(ext) = old_path.extension().and_then(|e| e.to_str()) {
                name = format!("{}.{}", name, ext);
            }
        }

        let new_path = parent.join(&name);
        if new_path == old_path {
            return Ok(record);
        }
        if new_path.exists() {
            return Err(ClipdexError::InvalidPath(format!(
                "target already exists: {}",
                new_path.display()
            )));
        }

        std::fs::rename(&old_path, &new_path)?;
        schema::update_video_path(&self.conn, id, &new_path.to_string_lossy(), &name)?;

        self.get(id)
    }

    /// Path of the cataloged thumbnail asset, or None when the record has
    /// no thumbnail or the asset file is gone.
    pub fn thumbnail(&self, id: i64) -> Result<Option<PathBuf>> {
        let record = self.get(id)?;
        Ok(record
            .thumbnail_path
            .map(PathBuf::from)
            .filter(|p| p.exists()))
    }

    // ----- Tags -----

    pub fn add_tag(&self, id: i64, name: &str) -> Result<()> {
        self.get(id)?;
        let tag_id = schema::get_or_create_tag(&self.conn, name)?;
        schema::add_video_tag(&self.conn, id, tag_id)
    }

    pub fn remove_tag(&self, id: i64, name: &str) -> Result<()> {
        self.get(id)?;
        let tag_id: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM tags WHERE name = ?1",
                rusqlite::params![name.trim()],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(tag_id) = tag_id {
            schema::remove_video_tag(&self.conn, id, tag_id)?;
        }
        Ok(())
    }

    /// Replace a video's tag set.
    pub fn set_tags(&self, id: i64, names: &[&str]) -> Result<()> {
        self.get(id)?;
        schema::set_video_tags(&self.conn, id, names)
    }

    pub fn tags(&self, id: i64) -> Result<Vec<Tag>> {
        self.get(id)?;
        schema::tags_for_video(&self.conn, id)
    }

    pub fn display_tags(&self, id: i64) -> Result<String> {
        self.get(id)?;
        schema::display_tags(&self.conn, id)
    }

    /// Reconcile the catalog with the filesystem: mark records whose file
    /// has vanished, clear the mark when a file reappears, and sweep
    /// thumbnail assets no cataloged fingerprint references.
    pub fn reconcile(&self) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();
        let videos = schema::list_videos(&self.conn)?;

        for video in &videos {
            let present = Path::new(&video.file_path).exists();
            if present && video.missing_at.is_some() {
                schema::clear_video_missing(&self.conn, video.id)?;
                report.restored += 1;
            } else if !present && video.missing_at.is_none() {
                log::info!("File missing for record {}: {}", video.id, video.file_path);
                schema::mark_video_missing(&self.conn, video.id)?;
                report.marked_missing += 1;
            }
        }

        report.orphan_thumbs_removed = self.sweep_orphan_thumbs(&videos)?;

        Ok(report)
    }

    /// Remove thumbnail assets whose fingerprint no record carries.
    fn sweep_orphan_thumbs(&self, videos: &[VideoRecord]) -> Result<usize> {
        let thumbs_dir = &self.config.thumbs_dir;
        if !thumbs_dir.is_dir() {
            return Ok(0);
        }

        let live: HashSet<&str> = videos.iter().filter_map(|v| v.hash.as_deref()).collect();

        let mut removed = 0;
        for entry in std::fs::read_dir(thumbs_dir)?.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(crate::constants::THUMB_FORMAT) {
                continue;
            }
            let stem = match path.file_stem().and_then(|s| s.to_str()) {
                Some(s) => s,
                None => continue,
            };
            if !live.contains(stem) {
                if std::fs::remove_file(&path).is_ok() {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileReport {
    pub marked_missing: usize,
    pub restored: usize,
    pub orphan_thumbs_removed: usize,
}
