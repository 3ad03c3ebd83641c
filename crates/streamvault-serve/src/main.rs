//! Streamvault Serve - standalone HTTP read API server.
//!
//! Serves the time-range read API over an existing archive file without
//! running the ingestion or retention tasks. The combined daemon in
//! `streamvault-ingest` embeds the same router.

use axum::http::Request;
use clap::Parser;
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use streamvault_core::Archive;
use streamvault_serve::{router, AppState};

/// Streamvault read API server.
#[derive(Parser, Debug)]
#[command(name = "streamvault-serve")]
#[command(about = "HTTP read API over a streamvault archive", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the archive SQLite file.
    #[arg(long, env = "STREAMVAULT_DB_PATH", default_value = ".streamvault/archive.db")]
    db_path: PathBuf,

    /// Port to listen on.
    #[arg(long, env = "STREAMVAULT_PORT", default_value = "4242")]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let archive = Archive::open(&args.db_path)?;
    let state = AppState::new(archive);

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
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, db = %args.db_path.display(), "starting read API server");

    axum::serve(listener, app).await?;

    Ok(())
}
