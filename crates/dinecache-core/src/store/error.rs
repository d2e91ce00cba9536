use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored data is corrupt: {0}")]
    Corrupt(String),

    #[error("Failed to encode row: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Stored schema version {stored} is newer than requested version {requested}")]
    VersionConflict { stored: u32, requested: u32 },

    #[error("Collection not found: {0}")]
    MissingCollection(String),

    #[error("Storage quota exceeded: need {needed} bytes, quota is {quota}")]
    QuotaExceeded { needed: usize, quota: usize },
}
