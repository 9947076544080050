use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::server::util::require_staff;
use crate::session::SessionContext;
use crate::types::AppState;

/// GET /cache/stats
///
/// Staff only. `cached` is false when schedules come from a local file.
pub async fn get_cache_stats(
    State(s): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
) -> Response {
    if let Err(resp) = require_staff(&session) {
        return resp;
    }

    let body = match s.cache_stats() {
        Some(stats) => json!({ "cached": true, "stats": stats }),
        None => json!({ "cached": false }),
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// POST /cache/invalidate
///
/// Drops the caller's own cached schedules so the next read goes to the backend.
pub async fn post_invalidate_cache(
    State(s): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
) -> Response {
    info!(session = %session.key(), "POST /cache/invalidate");
    s.invalidate(&session);
    (StatusCode::OK, Json(json!({ "invalidated": true }))).into_response()
}
