// Clipdex constants

// Library layout
pub const CLIPDEX_FOLDER: &str = ".clipdex";
pub const DB_FILENAME: &str = "clipdex.db";
pub const THUMBS_FOLDER: &str = "thumbs";

// Hashing
pub const HASH_CHUNK_SIZE: usize = 1_048_576; // 1MB

// Thumbnail settings
pub const THUMB_FORMAT: &str = "jpg";
pub const THUMB_QUALITY: u32 = 50;
pub const THUMB_SEEK_PERCENT: f64 = 0.1; // frame at 10% of the video

// Video extensions (case-insensitive match)
pub const VIDEO_EXTENSIONS: [&str; 12] = [
    "mp4", "avi", "mkv", "mov", "flv", "wmv", "webm", "m4v", "mpg", "mpeg",
    "ts", "3gp",
];
