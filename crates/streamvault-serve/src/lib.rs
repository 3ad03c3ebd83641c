//! HTTP read API over the streamvault archive.
//!
//! This crate provides the time-range read surface for archived stream
//! messages. It is a pure consumer of the shared [`Archive`] handle: every
//! query goes through the same process-wide exclusion discipline as the
//! ingestion loop and the retention scheduler.
//!
//! # Endpoints
//!
//! - `GET /get_item/{from_timestamp}/{to_timestamp}` — payloads in range
//! - `GET /get_latest_key` — the newest archived timestamp
//! - `GET /health` — liveness probe
//!
//! # Architecture
//!
//! - **AppState**: shared state (archive handle, process start time)
//! - **Routes**: endpoint handlers
//!
//! [`Archive`]: streamvault_core::Archive

mod error;
mod routes;
mod state;

pub use self::error::ApiError;
pub use self::routes::router;
pub use self::state::AppState;
