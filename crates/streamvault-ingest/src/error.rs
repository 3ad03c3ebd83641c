//! Error types for the archiver daemon.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during ingestion and retention.
#[derive(Error, Debug)]
pub enum Error {
    /// Archive store error. Fatal for the invoking task: an unacked
    /// message must not be acknowledged against a store we cannot trust.
    #[error("store error: {0}")]
    Store(#[from] streamvault_core::Error),

    /// The message source reported a failure.
    #[error("source error: {0}")]
    Source(String),

    /// The message source has no more messages and will never produce any
    /// (e.g., spool exhausted, queue producer dropped).
    #[error("message source closed")]
    SourceClosed,

    /// A message arrived without an origin-timestamp header.
    #[error("message has no origin timestamp header")]
    MissingTimestamp,

    /// The origin-timestamp header could not be parsed.
    #[error("invalid origin timestamp {value:?}: {reason}")]
    InvalidTimestamp {
        /// The raw header value.
        value: String,
        /// Why it failed to parse.
        reason: String,
    },

    /// Acknowledgment failed after a completed store operation.
    #[error("ack error: {0}")]
    Ack(String),

    /// Invalid configuration (unknown chain id, interval below minimum).
    /// Fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP transport error while querying the watermark authority.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Every watermark endpoint failed across every retry attempt.
    #[error("failed to resolve watermark from all endpoints after {attempts} attempts")]
    WatermarkExhausted {
        /// Number of attempts made.
        attempts: u32,
    },

    /// The watermark authority returned a value that is not a unix
    /// timestamp.
    #[error("malformed watermark {0:?}")]
    MalformedWatermark(String),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_timestamp_display() {
        let err = Error::InvalidTimestamp {
            value: "abc".to_string(),
            reason: "invalid digit".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("abc"));
        assert!(msg.contains("invalid digit"));
    }

    #[test]
    fn test_watermark_exhausted_display() {
        let err = Error::WatermarkExhausted { attempts: 15 };
        assert!(err.to_string().contains("15 attempts"));
    }

    #[test]
    fn test_from_store_error() {
        let store_err: streamvault_core::Error = rusqlite_no_rows();
        let err: Error = store_err.into();
        assert!(matches!(err, Error::Store(_)));
    }

    fn rusqlite_no_rows() -> streamvault_core::Error {
        // Produce a real store error without touching a database.
        streamvault_core::Error::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "synthetic",
        ))
    }
}
