//! Daemon constants and retention configuration.
//!
//! Configuration violations here are startup-fatal: the retention
//! scheduler never runs against an interval or chain id that did not pass
//! validation.

use crate::error::{Error, Result};
use std::time::Duration;

/// Maximum watermark resolution attempts before giving up.
pub const BACKOFF_MAX_RETRIES: u32 = 15;

/// Base delay for exponential backoff between resolution attempts.
pub const BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Upper bound on a single backoff sleep. The exponential schedule would
/// otherwise reach multi-hour delays at high attempt counts.
pub const BACKOFF_CAP: Duration = Duration::from_secs(60);

/// Fixed tick of the retention scheduler loop.
pub const RETENTION_TICK: Duration = Duration::from_secs(5);

/// Minimum allowed pruning interval, in minutes.
pub const MIN_PRUNING_INTERVAL_MINUTES: i64 = 10;

/// Chain identifiers the retention subsystem knows endpoints for.
pub const ALLOWED_CHAIN_IDS: [&str; 3] = ["kyve-1", "kaon-1", "korellia-2"];

/// Built-in watermark authority endpoints for a chain id.
///
/// Returns `None` for an unrecognized chain id; callers treat that as a
/// non-retryable configuration error.
pub fn endpoints_for_chain(chain_id: &str) -> Option<Vec<String>> {
    let endpoints: &[&str] = match chain_id {
        "kyve-1" => &["https://api.kyve.network"],
        "kaon-1" => &["https://api.kaon.kyve.network"],
        "korellia-2" => &["https://api.korellia.kyve.network"],
        _ => return None,
    };
    Some(endpoints.iter().map(|s| s.to_string()).collect())
}

/// Parse a comma-separated endpoint override list.
///
/// Empty entries are dropped; an entirely empty string yields `None`
/// (no override).
pub fn parse_endpoint_override(raw: &str) -> Option<Vec<String>> {
    let endpoints: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if endpoints.is_empty() {
        None
    } else {
        Some(endpoints)
    }
}

/// Validated retention configuration.
#[derive(Debug, Clone)]
pub struct RetentionConfig {
    /// Chain identifier selecting the built-in endpoint set.
    pub chain_id: String,

    /// Pool identifier on the watermark authority.
    pub pool_id: i64,

    /// Explicit endpoint override; bypasses the chain map when set.
    pub endpoint_override: Option<Vec<String>>,

    /// Minutes between pruning runs.
    pub pruning_interval_minutes: i64,
}

impl RetentionConfig {
    /// Validate a retention configuration before the scheduler starts.
    ///
    /// The interval must exceed [`MIN_PRUNING_INTERVAL_MINUTES`] and the
    /// chain id must be in [`ALLOWED_CHAIN_IDS`].
    pub fn new(
        chain_id: impl Into<String>,
        pool_id: i64,
        endpoint_override: Option<Vec<String>>,
        pruning_interval_minutes: i64,
    ) -> Result<Self> {
        let chain_id = chain_id.into();

        if pruning_interval_minutes <= MIN_PRUNING_INTERVAL_MINUTES {
            return Err(Error::Config(format!(
                "pruning interval must exceed {} minutes, got {}",
                MIN_PRUNING_INTERVAL_MINUTES, pruning_interval_minutes
            )));
        }

        if !ALLOWED_CHAIN_IDS.contains(&chain_id.as_str()) {
            return Err(Error::Config(format!(
                "unknown chain id {:?}, expected one of {:?}",
                chain_id, ALLOWED_CHAIN_IDS
            )));
        }

        Ok(Self {
            chain_id,
            pool_id,
            endpoint_override,
            pruning_interval_minutes,
        })
    }
}
