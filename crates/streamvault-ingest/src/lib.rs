//! Streamvault archiver pipeline.
//!
//! Ties together the three long-running tasks of the archiver daemon:
//!
//! - **Ingestion** ([`ingest`]): pull messages from a [`MessageSource`],
//!   dedup by content hash, archive, then acknowledge.
//! - **Retention** ([`retention`]): periodically resolve the external
//!   watermark and prune everything strictly older.
//! - The HTTP read API is embedded from `streamvault-serve`.
//!
//! All three share one [`Archive`] handle; its internal mutex is the only
//! coordination between them.
//!
//! [`MessageSource`]: source::MessageSource
//! [`Archive`]: streamvault_core::Archive

pub mod config;
pub mod error;
pub mod ingest;
pub mod retention;
pub mod source;
pub mod watermark;

pub use error::{Error, Result};
pub use ingest::{IngestOptions, IngestStats};
pub use retention::RetentionScheduler;
pub use source::{InboundMessage, MessageSource};
pub use watermark::WatermarkResolver;
