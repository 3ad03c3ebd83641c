//! Error types for the streamvault core.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the core archive layer.
#[derive(Error, Debug)]
pub enum Error {
    /// SQLite error from the underlying store.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// I/O error (e.g., creating the database directory).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
