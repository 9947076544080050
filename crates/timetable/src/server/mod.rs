use std::sync::Arc;

use axum::routing::{get, post};
use axum::{middleware as mw, Router};

use crate::server::endpoints::{cache, schedule, status, student};
use crate::server::middleware::session_validator;
use crate::types::AppState;

mod endpoints;
mod middleware;
mod types;
mod util;

pub use util::NOT_PUBLISHED_MESSAGE;

/// Creates a router that can be used by `axum`.
///
/// # Parameters
/// - `app_state`: The app server state.
///
/// # Returns
/// The router.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Staff dashboards: whole-schedule views and statistics
    let staff_router = Router::new()
        .route("/schedules", get(schedule::get_schedules))
        .route("/schedules/lookup", get(schedule::get_lookup))
        .route("/schedules/time_slots", get(schedule::get_time_slots))
        .route("/cache/stats", get(cache::get_cache_stats));

    // Student dashboard: the caller's own cohort
    let student_router = Router::new()
        .route("/student/schedule", get(student::get_student_schedule))
        .route("/student/today", get(student::get_today));

    let session_router = Router::new()
        .merge(staff_router)
        .merge(student_router)
        .route("/cache/invalidate", post(cache::post_invalidate_cache))
        .layer(mw::from_fn(session_validator::resolve_session));

    Router::new()
        .route("/health", get(status::get_health))
        .merge(session_router)
        .with_state(app_state)
}
