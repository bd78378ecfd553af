use thiserror::Error;

/// Storage-specific error types for the card cache.
///
/// Only mutations surface these errors. A failed lookup is reported as
/// "not found" so the engine falls back to the remote authority.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or rewriting the backing file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing store is not available
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
