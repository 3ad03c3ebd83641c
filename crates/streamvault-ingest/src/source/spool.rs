//! Spool file message source.
//!
//! Reads newline-delimited JSON records from a local file, one message per
//! line:
//!
//! ```json
//! {"timestamp": 1700000000000000000, "payload": "aGVsbG8="}
//! ```
//!
//! `timestamp` is the origin timestamp in nanoseconds since epoch and
//! `payload` is the base64-encoded message body. A spool is read once;
//! there is no redelivery, so acknowledgment is a no-op.

use super::{InboundMessage, MessageSource, NoopAck};
use crate::error::{Error, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct SpoolRecord {
    timestamp: i64,
    payload: String,
}

/// Message source backed by a newline-delimited JSON spool file.
pub struct SpoolSource {
    reader: BufReader<File>,
    line_no: usize,
    exhausted: bool,
}

impl SpoolSource {
    /// Open a spool file for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Ok(Self {
            reader: BufReader::new(file),
            line_no: 0,
            exhausted: false,
        })
    }

    fn next_message(&mut self) -> Result<Option<InboundMessage>> {
        loop {
            let mut line = String::new();
            let read = self.reader.read_line(&mut line)?;
            if read == 0 {
                self.exhausted = true;
                return Ok(None);
            }
            self.line_no += 1;

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let record: SpoolRecord = serde_json::from_str(line).map_err(|e| {
                Error::Source(format!("spool line {}: {}", self.line_no, e))
            })?;
            let payload = BASE64.decode(&record.payload).map_err(|e| {
                Error::Source(format!("spool line {}: bad base64 payload: {}", self.line_no, e))
            })?;

            return Ok(Some(InboundMessage::new(
                payload,
                Some(record.timestamp.to_string()),
                Box::new(NoopAck),
            )));
        }
    }
}

#[async_trait]
impl MessageSource for SpoolSource {
    fn name(&self) -> &'static str {
        "spool"
    }

    async fn fetch(&mut self, max: usize, _wait: Duration) -> Result<Vec<InboundMessage>> {
        if self.exhausted {
            return Err(Error::SourceClosed);
        }

        let mut messages = Vec::new();
        while messages.len() < max {
            match self.next_message()? {
                Some(msg) => messages.push(msg),
                None => break,
            }
        }

        if messages.is_empty() {
            return Err(Error::SourceClosed);
        }
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn spool_with(lines: &[&str]) -> (SpoolSource, NamedTempFile) {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file.flush().unwrap();
        let source = SpoolSource::open(file.path()).unwrap();
        (source, file)
    }

    #[tokio::test]
    async fn test_reads_records_in_order() {
        let (mut source, _file) = spool_with(&[
            r#"{"timestamp": 1700000000000000000, "payload": "b25l"}"#,
            r#"{"timestamp": 1700000001000000000, "payload": "dHdv"}"#,
        ]);

        let msgs = source.fetch(10, Duration::from_millis(10)).await.unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].payload, b"one");
        assert_eq!(msgs[1].payload, b"two");
        assert_eq!(
            msgs[0].origin_timestamp.as_deref(),
            Some("1700000000000000000")
        );
    }

    #[tokio::test]
    async fn test_respects_max() {
        let (mut source, _file) = spool_with(&[
            r#"{"timestamp": 1, "payload": "YQ=="}"#,
            r#"{"timestamp": 2, "payload": "Yg=="}"#,
            r#"{"timestamp": 3, "payload": "Yw=="}"#,
        ]);

        let first = source.fetch(2, Duration::from_millis(10)).await.unwrap();
        assert_eq!(first.len(), 2);
        let second = source.fetch(2, Duration::from_millis(10)).await.unwrap();
        assert_eq!(second.len(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_reports_closed() {
        let (mut source, _file) = spool_with(&[r#"{"timestamp": 1, "payload": "YQ=="}"#]);
        source.fetch(10, Duration::from_millis(10)).await.unwrap();

        let err = source
            .fetch(10, Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SourceClosed));
    }

    #[tokio::test]
    async fn test_skips_blank_lines() {
        let (mut source, _file) = spool_with(&["", r#"{"timestamp": 1, "payload": "YQ=="}"#, ""]);
        let msgs = source.fetch(10, Duration::from_millis(10)).await.unwrap();
        assert_eq!(msgs.len(), 1);
    }

    #[tokio::test]
    async fn test_bad_json_is_error() {
        let (mut source, _file) = spool_with(&["not json"]);
        let err = source
            .fetch(10, Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Source(_)));
        assert!(err.to_string().contains("line 1"));
    }

    #[tokio::test]
    async fn test_bad_base64_is_error() {
        let (mut source, _file) = spool_with(&[r#"{"timestamp": 1, "payload": "!!!"}"#]);
        let err = source
            .fetch(10, Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Source(_)));
        assert!(err.to_string().contains("base64"));
    }
}
