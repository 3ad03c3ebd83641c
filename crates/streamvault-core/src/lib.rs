//! Core types and shared utilities for the streamvault archiver.
//!
//! This crate provides:
//! - Content-hash message identity (the deduplication key)
//! - The durable SQLite-backed archive and its access discipline
//! - Prometheus metrics helpers
//! - Shared error types

mod archive;
mod error;
mod hash;
pub mod metrics;

pub use archive::Archive;
pub use error::{Error, Result};
pub use hash::message_id;
