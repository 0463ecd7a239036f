// Clipdex - personal video library core
//
// Scans directories for video files, fingerprints their content, extracts
// metadata, generates thumbnails, and keeps everything in a SQLite catalog.

pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod hash;
pub mod library;
pub mod metadata;
pub mod scan;
pub mod thumbs;
pub mod tools;

pub use config::LibraryConfig;
pub use db::schema::{DuplicateGroup, SearchMode, Tag, VideoRecord};
pub use error::{ClipdexError, Result};
pub use library::{Library, ReconcileReport};
pub use scan::{ScanEvent, ScanHandle, ScanReport};
