//! Archive read endpoints.
//!
//! Range reads return payloads base64-encoded inside a JSON array, the
//! encoding opaque byte sequences take on a JSON wire.

use axum::extract::{Path, State};
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;

use crate::error::ApiError;
use crate::state::AppState;

/// Response for the latest-key endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct LatestKeyResponse {
    /// Unix timestamp of the newest archived message.
    pub latest_key: i64,
}

/// `GET /get_item/{from_timestamp}/{to_timestamp}`
///
/// Returns the payloads of all messages with `created` in the inclusive
/// range, ordered by `created`. Ranges that reach before process start or
/// into the future yield an empty array, not an error.
pub async fn get_items(
    State(state): State<AppState>,
    Path((from_str, to_str)): Path<(String, String)>,
) -> Result<Json<Vec<String>>, ApiError> {
    let from: i64 = from_str
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("invalid from_timestamp: {}", e)))?;
    let to: i64 = to_str
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("invalid to_timestamp: {}", e)))?;

    tracing::debug!(from, to, "range query");

    // Nothing can have been archived before this process started.
    if state.start_time >= from {
        return Ok(Json(Vec::new()));
    }

    // Nothing can have been archived in the future.
    if chrono::Utc::now().timestamp() <= to {
        return Ok(Json(Vec::new()));
    }

    let payloads = state.archive.range_query(from, to)?;
    let encoded = payloads.iter().map(|p| BASE64.encode(p)).collect();

    Ok(Json(encoded))
}

/// `GET /get_latest_key`
///
/// Returns the maximum `created` timestamp currently archived.
pub async fn get_latest_key(
    State(state): State<AppState>,
) -> Result<Json<LatestKeyResponse>, ApiError> {
    let latest_key = state
        .archive
        .latest_created()?
        .ok_or_else(|| ApiError::NotFound("archive is empty".to_string()))?;

    Ok(Json(LatestKeyResponse { latest_key }))
}
