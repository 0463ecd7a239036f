// Library configuration
//
// The catalog location and thumbnail directory are passed in explicitly;
// nothing in the library reads them from globals.

use std::path::{Path, PathBuf};

use crate::constants::{CLIPDEX_FOLDER, DB_FILENAME, THUMBS_FOLDER};

#[derive(Debug, Clone)]
pub struct LibraryConfig {
    /// Path of the SQLite catalog file.
    pub db_path: PathBuf,
    /// Directory holding `<hash>.jpg` thumbnail assets.
    pub thumbs_dir: PathBuf,
}

impl LibraryConfig {
    /// Conventional layout under a library root: `.clipdex/clipdex.db`
    /// and `.clipdex/thumbs/`.
    pub fn for_root(root: &Path) -> Self {
        let folder = root.join(CLIPDEX_FOLDER);
        Self {
            db_path: folder.join(DB_FILENAME),
            thumbs_dir: folder.join(THUMBS_FOLDER),
        }
    }
}
