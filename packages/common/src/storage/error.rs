use thiserror::Error;

/// Errors from the task-file store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("stored file not found: {0}")]
    NotFound(String),
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid stored path: {0}")]
    InvalidPath(String),
    #[error("file exceeds size limit ({actual} > {limit} bytes)")]
    SizeLimitExceeded { actual: u64, limit: u64 },
}
