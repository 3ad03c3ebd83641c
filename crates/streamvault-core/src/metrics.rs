//! Prometheus metrics helpers for the streamvault system.
//!
//! Centralized metrics initialization and the metric names used across the
//! archiver components.
//!
//! # Metric Naming Conventions
//!
//! - Prefix: component name (`ingest_`, `retention_`, `watermark_`)
//! - Suffix: unit or type (`_total`, `_seconds`)

use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;

/// Initialize the Prometheus metrics recorder.
///
/// Must be called once at startup before any metrics are recorded.
/// Returns a handle for [`start_metrics_server`].
///
/// # Panics
///
/// Panics if called more than once (the recorder can only be installed once).
pub fn init_metrics() -> PrometheusHandle {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder");

    register_common_metrics();

    handle
}

/// Try to initialize the Prometheus metrics recorder.
///
/// Like [`init_metrics`] but returns `None` if the recorder is already
/// installed, instead of panicking. Useful for tests.
pub fn try_init_metrics() -> Option<PrometheusHandle> {
    PrometheusBuilder::new().install_recorder().ok()
}

/// Start the Prometheus metrics HTTP server.
///
/// Serves the `/metrics` endpoint on the given port. Spawns a background
/// task and returns immediately.
pub async fn start_metrics_server(
    port: u16,
    handle: PrometheusHandle,
) -> Result<(), std::io::Error> {
    let app = Router::new().route(
        "/metrics",
        get(move || {
            let handle = handle.clone();
            async move { handle.render() }
        }),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Metrics server listening on http://{}/metrics", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("metrics server exited: {}", e);
        }
    });

    Ok(())
}

/// Register descriptions for the metrics used across streamvault.
///
/// Called automatically by [`init_metrics`].
fn register_common_metrics() {
    describe_counter!(
        "ingest_messages_total",
        "Total messages fetched from the stream"
    );
    describe_counter!(
        "ingest_messages_stored_total",
        "Messages written to the archive as new rows"
    );
    describe_counter!(
        "ingest_messages_duplicate_total",
        "Redelivered messages skipped by dedup"
    );
    describe_gauge!(
        "ingest_running",
        "Whether the ingestion loop is running (1=yes, 0=no)"
    );

    describe_counter!("retention_prunes_total", "Completed pruning runs");
    describe_counter!(
        "retention_rows_deleted_total",
        "Archive rows deleted by pruning"
    );
    describe_gauge!(
        "retention_accumulated_minutes",
        "Minutes accumulated toward the next pruning run"
    );
    describe_gauge!(
        "retention_watermark_seconds",
        "Cutoff of the most recent pruning run (unix seconds)"
    );

    describe_counter!(
        "watermark_requests_total",
        "Watermark authority requests issued"
    );
    describe_counter!(
        "watermark_request_failures_total",
        "Watermark authority requests that failed (per endpoint)"
    );

    describe_gauge!("archive_messages", "Messages currently in the archive");
}
