// Catalog schema types and query helpers

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::error::{ClipdexError, Result};

// ----- Videos -----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: i64,
    pub file_path: String,
    pub file_name: String,
    pub file_size: i64,
    pub mod_date: String,
    pub duration: f64,
    pub thumbnail_path: Option<String>,
    /// Content fingerprint; None when hashing failed at scan time.
    pub hash: Option<String>,
    /// Set by reconcile when the underlying file has vanished.
    pub missing_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewVideo {
    pub file_path: String,
    pub file_name: String,
    pub file_size: i64,
    pub mod_date: String,
    pub duration: f64,
    pub thumbnail_path: Option<String>,
    pub hash: Option<String>,
}

const VIDEO_COLUMNS: &str = "id, file_path, file_name, file_size, mod_date, duration, \
                             thumbnail_path, hash, missing_at, created_at";

fn map_video(row: &rusqlite::Row) -> rusqlite::Result<VideoRecord> {
    Ok(VideoRecord {
        id: row.get(0)?,
        file_path: row.get(1)?,
        file_name: row.get(2)?,
        file_size: row.get(3)?,
        mod_date: row.get(4)?,
        duration: row.get(5)?,
        thumbnail_path: row.get(6)?,
        hash: row.get(7)?,
        missing_at: row.get(8)?,
        created_at: row.get(9)?,
    })
}

/// Insert a new video record. A UNIQUE violation on file_path maps to
/// DuplicatePath and leaves the catalog untouched.
pub fn insert_video(conn: &Connection, video: &NewVideo) -> Result<i64> {
    let result = conn.execute(
        "INSERT INTO videos (file_path, file_name, file_size, mod_date, duration, thumbnail_path, hash)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            video.file_path,
            video.file_name,
            video.file_size,
            video.mod_date,
            video.duration,
            video.thumbnail_path,
            video.hash,
        ],
    );

    match result {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(ClipdexError::DuplicatePath(video.file_path.clone()))
        }
        Err(e) => Err(e.into()),
    }
}

/// True iff a record with that exact path is already cataloged.
pub fn video_exists(conn: &Connection, file_path: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM videos WHERE file_path = ?1",
        params![file_path],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn get_video(conn: &Connection, id: i64) -> Result<Option<VideoRecord>> {
    let result = conn
        .query_row(
            &format!("SELECT {} FROM videos WHERE id = ?1", VIDEO_COLUMNS),
            params![id],
            map_video,
        )
        .optional()?;
    Ok(result)
}

pub fn get_video_by_path(conn: &Connection, file_path: &str) -> Result<Option<VideoRecord>> {
    let result = conn
        .query_row(
            &format!("SELECT {} FROM videos WHERE file_path = ?1", VIDEO_COLUMNS),
            params![file_path],
            map_video,
        )
        .optional()?;
    Ok(result)
}

/// All records, most recently modified first.
pub fn list_videos(conn: &Connection) -> Result<Vec<VideoRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM videos ORDER BY mod_date DESC, id DESC",
        VIDEO_COLUMNS
    ))?;
    let videos = stmt
        .query_map([], map_video)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(videos)
}

/// All records sharing a fingerprint. A file that failed hashing is never
/// reported as a duplicate of anything.
pub fn find_by_fingerprint(conn: &Connection, hash: &str) -> Result<Vec<VideoRecord>> {
    if hash.is_empty() {
        return Ok(Vec::new());
    }
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM videos WHERE hash = ?1 ORDER BY file_path ASC",
        VIDEO_COLUMNS
    ))?;
    let videos = stmt
        .query_map(params![hash], map_video)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(videos)
}

#[derive(Debug, Clone, Serialize)]
pub struct DuplicateGroup {
    pub hash: String,
    pub videos: Vec<VideoRecord>,
}

/// Groups of byte-identical files. Groups have size >= 2 by construction;
/// records with a null or empty hash are excluded.
pub fn duplicate_groups(conn: &Connection) -> Result<Vec<DuplicateGroup>> {
    let mut stmt = conn.prepare(
        "SELECT hash FROM videos
         WHERE hash IS NOT NULL AND hash != ''
         GROUP BY hash HAVING COUNT(*) >= 2
         ORDER BY hash ASC",
    )?;
    let hashes: Vec<String> = stmt
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut groups = Vec::with_capacity(hashes.len());
    for hash in hashes {
        let videos = find_by_fingerprint(conn, &hash)?;
        groups.push(DuplicateGroup { hash, videos });
    }
    Ok(groups)
}

/// Update path and display name after a rename. A single UPDATE statement,
/// so concurrent readers see either the old row or the new one.
pub fn update_video_path(conn: &Connection, id: i64, new_path: &str, new_name: &str) -> Result<()> {
    let rows = conn.execute(
        "UPDATE videos SET file_path = ?1, file_name = ?2 WHERE id = ?3",
        params![new_path, new_name, id],
    )?;
    if rows == 0 {
        return Err(ClipdexError::NotFound(format!("video id {}", id)));
    }
    Ok(())
}

pub fn mark_video_missing(conn: &Connection, id: i64) -> Result<()> {
    conn.execute(
        "UPDATE videos SET missing_at = datetime('now') WHERE id = ?1 AND missing_at IS NULL",
        params![id],
    )?;
    Ok(())
}

pub fn clear_video_missing(conn: &Connection, id: i64) -> Result<()> {
    conn.execute(
        "UPDATE videos SET missing_at = NULL WHERE id = ?1",
        params![id],
    )?;
    Ok(())
}

// ----- Search -----

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    All,
    Filename,
    Extension,
    Tag,
}

impl std::str::FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(SearchMode::All),
            "filename" => Ok(SearchMode::Filename),
            "extension" => Ok(SearchMode::Extension),
            "tag" => Ok(SearchMode::Tag),
            other => Err(format!("unknown search mode: {}", other)),
        }
    }
}

/// Escape %, _ and \ for a LIKE pattern with ESCAPE '\'.
fn escape_like(query: &str) -> String {
    query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Substring, case-insensitive search. `All` matches filename OR tags.
/// Results are ordered most-recently-modified first.
pub fn search_videos(conn: &Connection, query: &str, mode: SearchMode) -> Result<Vec<VideoRecord>> {
    if query.is_empty() {
        return list_videos(conn);
    }

    // Extension is not a stored column; derive it from file_name in Rust.
    if mode == SearchMode::Extension {
        let needle = query.to_lowercase();
        let videos = list_videos(conn)?
            .into_iter()
            .filter(|v| {
                std::path::Path::new(&v.file_name)
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.to_lowercase().contains(&needle))
                    .unwrap_or(false)
            })
            .collect();
        return Ok(videos);
    }

    let pattern = format!("%{}%", escape_like(&query.to_lowercase()));

    let filename_clause = r"lower(v.file_name) LIKE ?1 ESCAPE '\'";
    let tag_clause = r"EXISTS (SELECT 1 FROM video_tags vt JOIN tags t ON vt.tag_id = t.id
                              WHERE vt.video_id = v.id AND lower(t.name) LIKE ?1 ESCAPE '\')";

    let where_clause = match mode {
        SearchMode::Filename => filename_clause.to_string(),
        SearchMode::Tag => tag_clause.to_string(),
        SearchMode::All => format!("{} OR {}", filename_clause, tag_clause),
        SearchMode::Extension => unreachable!(),
    };

    let sql = format!(
        "SELECT {} FROM videos v WHERE {} ORDER BY v.mod_date DESC, v.id DESC",
        VIDEO_COLUMNS, where_clause
    );

    let mut stmt = conn.prepare(&sql)?;
    let videos = stmt
        .query_map(params![pattern], map_video)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(videos)
}

// ----- Tags -----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// Look up a tag by name (case-insensitive), creating it if absent.
pub fn get_or_create_tag(conn: &Connection, name: &str) -> Result<i64> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ClipdexError::InvalidPath("empty tag name".to_string()));
    }

    conn.execute("INSERT OR IGNORE INTO tags (name) VALUES (?1)", params![name])?;

    let id: i64 = conn.query_row(
        "SELECT id FROM tags WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )?;
    Ok(id)
}

pub fn add_video_tag(conn: &Connection, video_id: i64, tag_id: i64) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO video_tags (video_id, tag_id) VALUES (?1, ?2)",
        params![video_id, tag_id],
    )?;
    Ok(())
}

pub fn remove_video_tag(conn: &Connection, video_id: i64, tag_id: i64) -> Result<()> {
    conn.execute(
        "DELETE FROM video_tags WHERE video_id = ?1 AND tag_id = ?2",
        params![video_id, tag_id],
    )?;
    Ok(())
}

pub fn tags_for_video(conn: &Connection, video_id: i64) -> Result<Vec<Tag>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.name FROM video_tags vt
         JOIN tags t ON vt.tag_id = t.id
         WHERE vt.video_id = ?1
         ORDER BY t.name COLLATE NOCASE ASC",
    )?;
    let tags = stmt
        .query_map(params![video_id], |row| {
            Ok(Tag {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(tags)
}

/// Replace a video's tag set with the given names.
pub fn set_video_tags(conn: &Connection, video_id: i64, names: &[&str]) -> Result<()> {
    conn.execute(
        "DELETE FROM video_tags WHERE video_id = ?1",
        params![video_id],
    )?;
    for name in names {
        if name.trim().is_empty() {
            continue;
        }
        let tag_id = get_or_create_tag(conn, name)?;
        add_video_tag(conn, video_id, tag_id)?;
    }
    Ok(())
}

/// Comma-joined tag names for display.
pub fn display_tags(conn: &Connection, video_id: i64) -> Result<String> {
    let tags = tags_for_video(conn, video_id)?;
    Ok(tags
        .into_iter()
        .map(|t| t.name)
        .collect::<Vec<_>>()
        .join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_test_db;

    fn sample_video(path: &str, mod_date: &str, hash: Option<&str>) -> NewVideo {
        let file_name = std::path::Path::new(path)
            .file_name()
            .unwrap()
            .to_string_lossy()
            .to_string();
        NewVideo {
            file_path: path.to_string(),
            file_name,
            file_size: 1024,
            mod_date: mod_date.to_string(),
            duration: 30.0,
            thumbnail_path: None,
            hash: hash.map(String::from),
        }
    }

    #[test]
    fn test_insert_and_exists() {
        let conn = open_test_db();
        assert!(!video_exists(&conn, "/v/a.mp4").unwrap());

        let id = insert_video(&conn, &sample_video("/v/a.mp4", "2024-01-01 10:00:00", Some("h1"))).unwrap();
        assert!(video_exists(&conn, "/v/a.mp4").unwrap());

        let record = get_video(&conn, id).unwrap().unwrap();
        assert_eq!(record.file_name, "a.mp4");
        assert_eq!(record.hash.as_deref(), Some("h1"));
        assert!(record.missing_at.is_none());

        let by_path = get_video_by_path(&conn, "/v/a.mp4").unwrap().unwrap();
        assert_eq!(by_path.id, id);
        assert!(get_video_by_path(&conn, "/v/other.mp4").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_path_rejected() {
        let conn = open_test_db();
        insert_video(&conn, &sample_video("/v/a.mp4", "2024-01-01 10:00:00", None)).unwrap();

        let err = insert_video(&conn, &sample_video("/v/a.mp4", "2024-01-02 10:00:00", None))
            .unwrap_err();
        assert!(matches!(err, ClipdexError::DuplicatePath(_)));

        // Catalog state is unchanged
        assert_eq!(list_videos(&conn).unwrap().len(), 1);
    }

    #[test]
    fn test_list_orders_by_mod_date_desc() {
        let conn = open_test_db();
        insert_video(&conn, &sample_video("/v/old.mp4", "2023-05-01 08:00:00", None)).unwrap();
        insert_video(&conn, &sample_video("/v/new.mp4", "2024-06-01 08:00:00", None)).unwrap();
        insert_video(&conn, &sample_video("/v/mid.mp4", "2023-12-01 08:00:00", None)).unwrap();

        let names: Vec<_> = list_videos(&conn)
            .unwrap()
            .into_iter()
            .map(|v| v.file_name)
            .collect();
        assert_eq!(names, vec!["new.mp4", "mid.mp4", "old.mp4"]);
    }

    #[test]
    fn test_duplicate_groups_exclude_null_hash_and_singletons() {
        let conn = open_test_db();
        insert_video(&conn, &sample_video("/v/a.mp4", "2024-01-01 10:00:00", Some("same"))).unwrap();
        insert_video(&conn, &sample_video("/v/b.mp4", "2024-01-01 11:00:00", Some("same"))).unwrap();
        insert_video(&conn, &sample_video("/v/c.mp4", "2024-01-01 12:00:00", Some("lone"))).unwrap();
        insert_video(&conn, &sample_video("/v/x.mp4", "2024-01-01 13:00:00", None)).unwrap();
        insert_video(&conn, &sample_video("/v/y.mp4", "2024-01-01 14:00:00", None)).unwrap();

        let groups = duplicate_groups(&conn).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].hash, "same");
        assert_eq!(groups[0].videos.len(), 2);

        // Null-hash records never group, even with each other
        assert!(find_by_fingerprint(&conn, "").unwrap().is_empty());
    }

    #[test]
    fn test_update_path_in_place() {
        let conn = open_test_db();
        let id = insert_video(&conn, &sample_video("/v/old.mp4", "2024-01-01 10:00:00", Some("h"))).unwrap();

        update_video_path(&conn, id, "/v/new.mp4", "new.mp4").unwrap();

        let record = get_video(&conn, id).unwrap().unwrap();
        assert_eq!(record.file_path, "/v/new.mp4");
        assert_eq!(record.file_name, "new.mp4");
        // Same id, hash untouched
        assert_eq!(record.hash.as_deref(), Some("h"));

        assert!(search_videos(&conn, "old", SearchMode::Filename).unwrap().is_empty());
        assert_eq!(search_videos(&conn, "new", SearchMode::Filename).unwrap().len(), 1);
    }

    #[test]
    fn test_update_path_unknown_id_is_not_found() {
        let conn = open_test_db();
        let err = update_video_path(&conn, 999, "/v/x.mp4", "x.mp4").unwrap_err();
        assert!(matches!(err, ClipdexError::NotFound(_)));
    }

    #[test]
    fn test_search_filename_case_insensitive_substring() {
        let conn = open_test_db();
        insert_video(&conn, &sample_video("/v/Beach_Holiday.mp4", "2024-01-01 10:00:00", None)).unwrap();
        insert_video(&conn, &sample_video("/v/lecture.mkv", "2024-01-02 10:00:00", None)).unwrap();

        let hits = search_videos(&conn, "holiday", SearchMode::Filename).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].file_name, "Beach_Holiday.mp4");
    }

    #[test]
    fn test_search_extension_derived_from_name() {
        let conn = open_test_db();
        insert_video(&conn, &sample_video("/v/a.mp4", "2024-01-01 10:00:00", None)).unwrap();
        insert_video(&conn, &sample_video("/v/b.MKV", "2024-01-02 10:00:00", None)).unwrap();

        let hits = search_videos(&conn, "mkv", SearchMode::Extension).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].file_name, "b.MKV");
    }

    #[test]
    fn test_search_tag_substring() {
        let conn = open_test_db();
        let a = insert_video(&conn, &sample_video("/v/a.mp4", "2024-01-01 10:00:00", None)).unwrap();
        let b = insert_video(&conn, &sample_video("/v/b.mp4", "2024-01-02 10:00:00", None)).unwrap();

        set_video_tags(&conn, a, &["Travel2024", "family"]).unwrap();
        set_video_tags(&conn, b, &["work"]).unwrap();

        let hits = search_videos(&conn, "travel", SearchMode::Tag).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, a);

        // Tag mode never matches on filename
        assert!(search_videos(&conn, "b.mp4", SearchMode::Tag).unwrap().is_empty());
    }

    #[test]
    fn test_search_all_matches_filename_or_tag() {
        let conn = open_test_db();
        let a = insert_video(&conn, &sample_video("/v/sunset.mp4", "2024-01-01 10:00:00", None)).unwrap();
        let b = insert_video(&conn, &sample_video("/v/b.mp4", "2024-01-02 10:00:00", None)).unwrap();
        set_video_tags(&conn, b, &["sunset shots"]).unwrap();

        let hits = search_videos(&conn, "sunset", SearchMode::All).unwrap();
        let ids: Vec<_> = hits.iter().map(|v| v.id).collect();
        assert!(ids.contains(&a) && ids.contains(&b));
        // Most recently modified first
        assert_eq!(hits[0].id, b);
    }

    #[test]
    fn test_like_wildcards_are_literal() {
        let conn = open_test_db();
        insert_video(&conn, &sample_video("/v/100%_done.mp4", "2024-01-01 10:00:00", None)).unwrap();
        insert_video(&conn, &sample_video("/v/plain.mp4", "2024-01-02 10:00:00", None)).unwrap();

        let hits = search_videos(&conn, "100%", SearchMode::Filename).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].file_name, "100%_done.mp4");
    }

    #[test]
    fn test_tag_names_unique_case_insensitive() {
        let conn = open_test_db();
        let first = get_or_create_tag(&conn, "Travel").unwrap();
        let second = get_or_create_tag(&conn, "travel").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_set_tags_replaces_and_display_joins() {
        let conn = open_test_db();
        let id = insert_video(&conn, &sample_video("/v/a.mp4", "2024-01-01 10:00:00", None)).unwrap();

        set_video_tags(&conn, id, &["beach", "family"]).unwrap();
        assert_eq!(display_tags(&conn, id).unwrap(), "beach, family");

        set_video_tags(&conn, id, &["work"]).unwrap();
        assert_eq!(display_tags(&conn, id).unwrap(), "work");
    }

    #[test]
    fn test_video_delete_cascades_links() {
        let conn = open_test_db();
        let id = insert_video(&conn, &sample_video("/v/a.mp4", "2024-01-01 10:00:00", None)).unwrap();
        set_video_tags(&conn, id, &["beach"]).unwrap();

        conn.execute("DELETE FROM videos WHERE id = ?1", params![id]).unwrap();

        let links: i64 = conn
            .query_row("SELECT COUNT(*) FROM video_tags", [], |row| row.get(0))
            .unwrap();
        assert_eq!(links, 0);
    }

    #[test]
    fn test_mark_and_clear_missing() {
        let conn = open_test_db();
        let id = insert_video(&conn, &sample_video("/v/a.mp4", "2024-01-01 10:00:00", None)).unwrap();

        mark_video_missing(&conn, id).unwrap();
        assert!(get_video(&conn, id).unwrap().unwrap().missing_at.is_some());

        clear_video_missing(&conn, id).unwrap();
        assert!(get_video(&conn, id).unwrap().unwrap().missing_at.is_none());
    }
}
