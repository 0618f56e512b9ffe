use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Collection is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Username already exists: {0}")]
    DuplicateUsername(String),

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),
}
