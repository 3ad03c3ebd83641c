//! Application state shared by all request handlers.

use streamvault_core::Archive;

/// Shared application state available to all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Shared archive handle. Cloned from the daemon's handle so reads
    /// serialize against inserts and prunes.
    pub archive: Archive,

    /// Unix timestamp of process start. Range requests reaching before
    /// this point return an empty set.
    pub start_time: i64,
}

impl AppState {
    /// Create state over an archive handle, stamping the current time as
    /// the process start.
    pub fn new(archive: Archive) -> Self {
        Self {
            archive,
            start_time: chrono::Utc::now().timestamp(),
        }
    }

    /// Create state with an explicit start time. Used by tests.
    pub fn with_start_time(archive: Archive, start_time: i64) -> Self {
        Self {
            archive,
            start_time,
        }
    }
}
