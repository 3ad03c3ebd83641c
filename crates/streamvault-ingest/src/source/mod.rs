//! Message source adapters.
//!
//! The stream itself (connection, subject routing, consumer provisioning)
//! lives outside this daemon. What the ingestion loop needs is narrower:
//! pull the next unacknowledged messages, read their origin-timestamp
//! header, and acknowledge each one after it has been durably archived.
//! [`MessageSource`] is that capability.
//!
//! # Available Sources
//!
//! - [`QueueSource`] - in-memory channel-backed source; the seam used by
//!   tests and by callers embedding the pipeline behind their own transport
//! - [`SpoolSource`] - newline-delimited JSON records read from a file

mod queue;
mod spool;

pub use queue::{queue_source, AckProbe, QueueProducer, QueueSource};
pub use spool::SpoolSource;

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Acknowledgment half of a pulled message.
///
/// Consumed exactly once, and only after the archive insert (or a
/// confirmed dedup no-op) has completed. An unconsumed token means the
/// message stays unacknowledged and will be redelivered.
#[async_trait]
pub trait Acknowledge: Send {
    /// Acknowledge the message back to the source.
    async fn ack(self: Box<Self>) -> Result<()>;
}

/// One message pulled from a source, not yet acknowledged.
pub struct InboundMessage {
    /// Opaque message payload.
    pub payload: Vec<u8>,

    /// Raw origin-timestamp header value: nanoseconds since epoch, as the
    /// stream attaches it. `None` when the header is absent.
    pub origin_timestamp: Option<String>,

    acker: Box<dyn Acknowledge>,
}

// Manual impl: the ack token is a trait object with no Debug bound.
impl std::fmt::Debug for InboundMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InboundMessage")
            .field("payload", &self.payload)
            .field("origin_timestamp", &self.origin_timestamp)
            .finish_non_exhaustive()
    }
}

impl InboundMessage {
    /// Build a message around an acknowledgment token.
    pub fn new(
        payload: Vec<u8>,
        origin_timestamp: Option<String>,
        acker: Box<dyn Acknowledge>,
    ) -> Self {
        Self {
            payload,
            origin_timestamp,
            acker,
        }
    }

    /// Acknowledge the message, consuming it.
    pub async fn ack(self) -> Result<()> {
        self.acker.ack().await
    }
}

/// A pull-based source of stream messages with manual acknowledgment.
#[async_trait]
pub trait MessageSource: Send {
    /// Human-readable name for this source (used in logs).
    fn name(&self) -> &'static str;

    /// Pull up to `max` unacknowledged messages.
    ///
    /// Waits at most `wait` for the first message; an elapsed wait returns
    /// an empty vec so the caller can recheck its cancellation flag.
    /// Returns [`Error::SourceClosed`] once the source is permanently
    /// exhausted.
    ///
    /// [`Error::SourceClosed`]: crate::error::Error::SourceClosed
    async fn fetch(&mut self, max: usize, wait: Duration) -> Result<Vec<InboundMessage>>;
}

/// Acknowledgment token that does nothing.
///
/// For sources without redelivery (e.g., a spool file read once).
pub struct NoopAck;

#[async_trait]
impl Acknowledge for NoopAck {
    async fn ack(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
