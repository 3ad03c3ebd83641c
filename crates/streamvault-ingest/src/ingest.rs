//! The ingestion loop.
//!
//! Pulls messages from a [`MessageSource`], deduplicates them by
//! content-hash identity, archives them, and acknowledges each one only
//! after the archive write (or a confirmed dedup no-op) has completed.
//! That ordering is what turns at-least-once delivery into at-most-once
//! storage: a crash between insert and ack costs a redelivery, never a
//! lost message, and the redelivered copy dedups to a no-op.
//!
//! # Fatal conditions
//!
//! A message without a parseable origin timestamp stops the loop: the
//! timestamp feeds retention, so archiving an untimestamped message would
//! silently corrupt the pruning boundary. A store-level insert failure
//! also stops the loop, with the message left unacknowledged so the
//! stream redelivers it.

use crate::error::{Error, Result};
use crate::source::{InboundMessage, MessageSource};
use metrics::{counter, gauge};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use streamvault_core::{message_id, Archive};
use tracing::{debug, info, warn};

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Options for the ingestion loop.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Maximum messages per fetch.
    pub fetch_batch: usize,

    /// How long a fetch waits for the first message before returning
    /// empty. Bounds how stale the cancellation check can get.
    pub fetch_wait: Duration,

    /// Log full payloads at debug level.
    pub debug: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            fetch_batch: 16,
            fetch_wait: Duration::from_secs(1),
            debug: false,
        }
    }
}

/// Counters from an ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Messages pulled from the source.
    pub received: u64,

    /// Messages archived as new rows.
    pub stored: u64,

    /// Redelivered messages skipped by dedup (still acknowledged).
    pub duplicates: u64,
}

/// Derive the `created` timestamp (unix seconds) from a message's
/// origin-timestamp header (nanoseconds since epoch).
fn created_from(msg: &InboundMessage) -> Result<i64> {
    let raw = msg.origin_timestamp.as_deref().ok_or(Error::MissingTimestamp)?;
    let nanos: i64 = raw.parse().map_err(|e: std::num::ParseIntError| {
        Error::InvalidTimestamp {
            value: raw.to_string(),
            reason: e.to_string(),
        }
    })?;
    Ok(nanos / NANOS_PER_SECOND)
}

/// Run the ingestion loop until cancellation or source exhaustion.
///
/// Returns the run's counters on a clean stop (running flag cleared, or
/// the source closed). Any error is fatal to the loop and leaves the
/// in-flight message unacknowledged.
pub async fn run<S: MessageSource>(
    source: &mut S,
    archive: &Archive,
    running: Arc<AtomicBool>,
    opts: IngestOptions,
) -> Result<IngestStats> {
    let mut stats = IngestStats::default();
    info!(source = source.name(), "ingestion loop started");
    gauge!("ingest_running").set(1.0);

    while running.load(Ordering::SeqCst) {
        let messages = match source.fetch(opts.fetch_batch, opts.fetch_wait).await {
            Ok(messages) => messages,
            Err(Error::SourceClosed) => {
                info!(source = source.name(), "source closed, stopping ingestion");
                break;
            }
            Err(e) => return Err(e),
        };

        // Every fetched message is processed and acknowledged
        // individually; none are dropped.
        let batch = messages.len();
        for msg in messages {
            stats.received += 1;
            counter!("ingest_messages_total").increment(1);

            let created = created_from(&msg)?;
            let id = message_id(created, &msg.payload);

            debug!(created, size = msg.payload.len(), "received message");
            if opts.debug {
                debug!(payload = %String::from_utf8_lossy(&msg.payload), "payload");
            }

            // Store before ack, always. An error here leaves the message
            // unacknowledged for redelivery.
            let inserted = archive.insert(&id, created, &msg.payload)?;
            if inserted {
                stats.stored += 1;
                counter!("ingest_messages_stored_total").increment(1);
            } else {
                // Already archived: redelivery, not data loss.
                stats.duplicates += 1;
                counter!("ingest_messages_duplicate_total").increment(1);
                warn!(id = %id, "duplicate message, skipping insert");
            }

            msg.ack().await?;
        }

        if batch > 0 {
            gauge!("archive_messages").set(archive.count()? as f64);
        }
    }

    gauge!("ingest_running").set(0.0);
    info!(
        received = stats.received,
        stored = stats.stored,
        duplicates = stats.duplicates,
        "ingestion loop stopped"
    );
    Ok(stats)
}
