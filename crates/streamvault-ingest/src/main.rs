//! Streamvault - stream message archiver daemon.
//!
//! Runs the full pipeline in one process: ingestion, watermark-driven
//! retention, and the HTTP read API, all sharing a single archive handle.
//! Any task failing fatally takes the process down non-zero; Ctrl-C stops
//! everything cleanly.

use anyhow::Context;
use axum::http::Request;
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use streamvault_core::metrics::{init_metrics, start_metrics_server};
use streamvault_core::Archive;
use streamvault_ingest::config::{parse_endpoint_override, RetentionConfig};
use streamvault_ingest::source::SpoolSource;
use streamvault_ingest::{ingest, IngestOptions, RetentionScheduler, WatermarkResolver};
use streamvault_serve::{router, AppState};

/// Streamvault archiver daemon.
#[derive(Parser, Debug)]
#[command(name = "streamvault")]
#[command(about = "Stream message archiver: ingestion, retention, read API", long_about = None)]
#[command(version)]
struct Args {
    /// Stream access token (held for an external transport adapter).
    #[arg(long, env = "STREAMVAULT_TOKEN")]
    token: Option<String>,

    /// Stream server URL (held for an external transport adapter).
    #[arg(long, env = "STREAMVAULT_STREAM_URL")]
    stream_url: Option<String>,

    /// Durable consumer identifier on the stream.
    #[arg(long, env = "STREAMVAULT_CONSUMER_ID")]
    consumer_id: Option<String>,

    /// Spool file to ingest (newline-delimited JSON records). Without it
    /// the daemon runs retention and the read API only.
    #[arg(long, env = "STREAMVAULT_SPOOL")]
    spool: Option<PathBuf>,

    /// Path to the archive SQLite file.
    #[arg(long, env = "STREAMVAULT_DB_PATH", default_value = ".streamvault/archive.db")]
    db_path: PathBuf,

    /// Port for the HTTP read API.
    #[arg(long, env = "STREAMVAULT_PORT", default_value = "4242")]
    port: u16,

    /// Minutes between pruning runs. 0 disables retention.
    #[arg(long, env = "STREAMVAULT_PRUNING_INTERVAL", default_value = "0")]
    pruning_interval: i64,

    /// Chain id of the watermark authority.
    #[arg(long, env = "STREAMVAULT_CHAIN_ID", default_value = "kyve-1")]
    chain_id: String,

    /// Pool id on the watermark authority.
    #[arg(long, env = "STREAMVAULT_POOL_ID", default_value = "0")]
    pool_id: i64,

    /// Comma-separated watermark endpoint override.
    #[arg(long, env = "STREAMVAULT_ENDPOINTS", default_value = "")]
    endpoints: String,

    /// Port for the Prometheus /metrics endpoint.
    #[arg(long, env = "STREAMVAULT_METRICS_PORT", default_value = "9090")]
    metrics_port: u16,

    /// Log full message payloads at debug level.
    #[arg(long, env = "STREAMVAULT_DEBUG")]
    debug: bool,
}

/// Join-handle result flattened to one error, tagged with the task name.
fn task_outcome(
    name: &'static str,
    res: std::result::Result<streamvault_ingest::Result<()>, tokio::task::JoinError>,
) -> anyhow::Result<()> {
    match res {
        Ok(Ok(())) => {
            info!(task = name, "task finished");
            Ok(())
        }
        Ok(Err(e)) => Err(anyhow::Error::new(e).context(format!("{name} task failed"))),
        Err(e) => Err(anyhow::Error::new(e).context(format!("{name} task panicked"))),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .init();

    // All configuration errors surface before any task spawns.
    let retention_config = if args.pruning_interval != 0 {
        Some(RetentionConfig::new(
            args.chain_id.clone(),
            args.pool_id,
            parse_endpoint_override(&args.endpoints),
            args.pruning_interval,
        )?)
    } else {
        None
    };

    if args.stream_url.is_some() && args.spool.is_none() {
        anyhow::bail!(
            "stream transport is provided by an embedding adapter; \
             pass --spool to ingest from a spool file"
        );
    }
    if args.token.is_some() || args.consumer_id.is_some() {
        info!(
            consumer = args.consumer_id.as_deref().unwrap_or("-"),
            "stream credentials held for the transport adapter"
        );
    }

    let spool = match &args.spool {
        Some(path) => Some(
            SpoolSource::open(path)
                .with_context(|| format!("opening spool {}", path.display()))?,
        ),
        None => None,
    };

    let archive = Archive::open(&args.db_path)
        .with_context(|| format!("opening archive {}", args.db_path.display()))?;
    info!(db = %args.db_path.display(), messages = archive.count()?, "archive opened");

    let metrics_handle = init_metrics();
    start_metrics_server(args.metrics_port, metrics_handle).await?;

    let running = Arc::new(AtomicBool::new(true));

    let has_ingest = spool.is_some();
    let has_retention = retention_config.is_some();

    // Ingestion task. Without a source it parks forever so the supervisor
    // select! has a uniform shape.
    let mut ingest_handle: JoinHandle<streamvault_ingest::Result<()>> = match spool {
        Some(mut source) => {
            let archive = archive.clone();
            let running = Arc::clone(&running);
            let opts = IngestOptions {
                debug: args.debug,
                ..Default::default()
            };
            tokio::spawn(async move {
                ingest::run(&mut source, &archive, running, opts).await?;
                Ok(())
            })
        }
        None => tokio::spawn(std::future::pending()),
    };

    // Retention task, when enabled.
    let mut retention_handle: JoinHandle<streamvault_ingest::Result<()>> = match retention_config {
        Some(config) => {
            let resolver = WatermarkResolver::new(
                &config.chain_id,
                config.pool_id,
                config.endpoint_override.clone(),
            )?;
            let scheduler =
                RetentionScheduler::new(archive.clone(), resolver, config.pruning_interval_minutes);
            let running = Arc::clone(&running);
            tokio::spawn(async move { scheduler.run(running).await })
        }
        None => {
            info!("retention disabled (pruning interval 0)");
            tokio::spawn(std::future::pending())
        }
    };

    // HTTP read API task.
    let mut api_handle: JoinHandle<streamvault_ingest::Result<()>> = {
        let state = AppState::new(archive.clone());
        let app = router(state)
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                    tracing::span!(
                        Level::INFO,
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                }),
            )
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        let addr = format!("0.0.0.0:{}", args.port);
        tokio::spawn(async move {
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            info!(addr = %addr, "read API listening");
            axum::serve(listener, app).await?;
            Ok(())
        })
    };

    // Supervise: first fatal task error or Ctrl-C stops everything.
    let outcome = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            Ok(())
        }
        res = &mut ingest_handle => task_outcome("ingestion", res),
        res = &mut retention_handle => task_outcome("retention", res),
        res = &mut api_handle => task_outcome("read API", res),
    };

    running.store(false, Ordering::SeqCst);

    // The loops check the flag within one bounded fetch/tick; the API
    // server has no flag to check, so it is aborted outright. Parked
    // placeholder tasks are aborted too.
    api_handle.abort();
    for (enabled, handle) in [(has_ingest, ingest_handle), (has_retention, retention_handle)] {
        if !enabled {
            handle.abort();
            continue;
        }
        if handle.is_finished() {
            continue;
        }
        if tokio::time::timeout(Duration::from_secs(10), handle).await.is_err() {
            error!("task did not drain within 10s");
        }
    }

    if let Err(e) = &outcome {
        error!(error = %e, "daemon stopping after fatal task error");
    }
    outcome
}
