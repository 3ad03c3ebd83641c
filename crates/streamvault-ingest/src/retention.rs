//! Watermark-driven retention.
//!
//! The scheduler wakes on a short fixed tick. Every tick resolves the
//! current watermark, so an authority outage surfaces within one tick
//! rather than at the next pruning run; once accumulated elapsed time
//! exceeds the configured pruning interval, every archived message
//! strictly older than the watermark is deleted. Watermarked data has
//! been durably persisted elsewhere, so deleting below the watermark
//! never loses anything.
//!
//! The accumulator starts at zero on every process start; a restart
//! defers the first pruning run by a full interval rather than firing
//! immediately against a possibly stale environment.

use crate::config::RETENTION_TICK;
use crate::error::{Error, Result};
use crate::watermark::WatermarkResolver;
use metrics::{counter, gauge};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use streamvault_core::Archive;
use tokio::time::sleep;
use tracing::{debug, info};

/// Periodic pruning loop over an archive.
pub struct RetentionScheduler {
    archive: Archive,
    resolver: WatermarkResolver,
    interval_minutes: i64,
    tick: Duration,
}

impl RetentionScheduler {
    pub fn new(archive: Archive, resolver: WatermarkResolver, interval_minutes: i64) -> Self {
        Self {
            archive,
            resolver,
            interval_minutes,
            tick: RETENTION_TICK,
        }
    }

    /// Override the tick duration. Used by tests to avoid real-time waits.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Run the scheduler until the running flag clears.
    ///
    /// A watermark that cannot be resolved after every retry, or a
    /// malformed watermark value, is fatal: retention silently standing
    /// still would let the archive grow without bound.
    pub async fn run(&self, running: Arc<AtomicBool>) -> Result<()> {
        let interval = self.interval_minutes as f64;
        let tick_minutes = self.tick.as_secs_f64() / 60.0;
        let mut accumulated = 0.0_f64;

        info!(
            interval_minutes = self.interval_minutes,
            "retention scheduler started"
        );

        while running.load(Ordering::SeqCst) {
            // Resolved every tick, not just on pruning ticks: a dead or
            // malformed authority is fatal within one tick.
            let cutoff = self.resolve_cutoff().await?;

            if accumulated > interval {
                accumulated = 0.0;
                self.prune_to(cutoff)?;
            }

            sleep(self.tick).await;
            accumulated += tick_minutes;
            gauge!("retention_accumulated_minutes").set(accumulated);
        }

        info!("retention scheduler stopped");
        Ok(())
    }

    /// Resolve the watermark and parse it as a unix-seconds cutoff.
    async fn resolve_cutoff(&self) -> Result<i64> {
        let raw = self.resolver.resolve().await?;
        raw.parse().map_err(|_| Error::MalformedWatermark(raw))
    }

    /// Resolve the watermark once and delete everything strictly older.
    pub async fn prune(&self) -> Result<usize> {
        let cutoff = self.resolve_cutoff().await?;
        self.prune_to(cutoff)
    }

    fn prune_to(&self, cutoff: i64) -> Result<usize> {
        let deleted = self.archive.delete_before(cutoff)?;

        counter!("retention_prunes_total").increment(1);
        counter!("retention_rows_deleted_total").increment(deleted as u64);
        gauge!("retention_watermark_seconds").set(cutoff as f64);
        gauge!("archive_messages").set(self.archive.count()? as f64);

        if deleted > 0 {
            info!(cutoff, deleted, "pruned archived messages below watermark");
        } else {
            debug!(cutoff, "nothing to prune below watermark");
        }
        Ok(deleted)
    }
}
