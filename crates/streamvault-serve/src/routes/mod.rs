//! API route definitions.

mod health;
mod items;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;

/// Build the complete API router.
///
/// # Route Structure
///
/// - `GET /health` - Health check
/// - `GET /get_item/{from_timestamp}/{to_timestamp}` - Payloads in range
/// - `GET /get_latest_key` - Newest archived timestamp
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route(
            "/get_item/{from_timestamp}/{to_timestamp}",
            get(items::get_items),
        )
        .route("/get_latest_key", get(items::get_latest_key))
        .with_state(state)
}
