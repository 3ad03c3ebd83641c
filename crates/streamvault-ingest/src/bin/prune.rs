//! One-shot manual pruning of an archive.
//!
//! Deletes every archived message created strictly before the given unix
//! timestamp, without consulting the watermark authority. For operator
//! use when the automatic retention path is disabled or stuck.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use streamvault_core::Archive;
use tracing_subscriber::EnvFilter;

/// Streamvault manual prune.
#[derive(Parser, Debug)]
#[command(name = "streamvault-prune")]
#[command(about = "Delete archived messages older than a unix timestamp", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the archive SQLite file.
    #[arg(long, env = "STREAMVAULT_DB_PATH", default_value = ".streamvault/archive.db")]
    db_path: PathBuf,

    /// Delete messages created strictly before this unix timestamp
    /// (seconds).
    #[arg(long)]
    until: i64,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let archive = Archive::open(&args.db_path)
        .with_context(|| format!("opening archive {}", args.db_path.display()))?;

    let before = archive.count()?;
    let deleted = archive.delete_before(args.until)?;

    tracing::info!(
        until = args.until,
        deleted,
        remaining = before - deleted as u64,
        "prune complete"
    );
    Ok(())
}
