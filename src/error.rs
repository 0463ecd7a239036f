// Clipdex error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClipdexError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Path already cataloged: {0}")]
    DuplicatePath(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for ClipdexError {
    fn from(err: anyhow::Error) -> Self {
        ClipdexError::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClipdexError>;
