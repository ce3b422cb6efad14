//! IP lookup handler
//!
//! `GET /ip/{ip}` answers with every country block containing the address.

use crate::lens::lookup::{LookupLens, LookupResponse};
use crate::server::protocol::ApiError;
use crate::server::ServerState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Handler for `GET /ip/{ip}`
///
/// 200 with matches, 404 with an empty match list, 400 on a malformed address.
pub async fn ip_lookup_handler(
    State(state): State<ServerState>,
    Path(ip): Path<String>,
) -> Result<Response, ApiError> {
    // hold one snapshot for the whole request, a concurrent refresh cannot tear it
    let snapshot = state.index.load();
    let lens = LookupLens::new(&snapshot.index);

    let matches = lens.lookup(&ip)?;
    tracing::debug!(
        "lookup {} -> {} matches (index v{})",
        ip,
        matches.len(),
        snapshot.version
    );

    let response = LookupResponse::from_matches(matches);
    let status = if response.is_empty() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::OK
    };
    Ok((status, Json(response)).into_response())
}

// =============================================================================
// Tests
// =============================================================================
