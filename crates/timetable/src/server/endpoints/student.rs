use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::{Datelike, Local};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

use super::RefreshParams;
use crate::schedule::{self, parse_clock_strict, Clock};
use crate::server::types::ApiErrorType;
use crate::server::util::{not_published, require_student_profile, schedule_error_to_response};
use crate::session::SessionContext;
use crate::types::AppState;

/// Overrides for the reference instant; both default to local now.
#[derive(Debug, Default, Deserialize)]
pub struct TodayQuery {
    /// Weekday name, e.g. `Monday`
    pub day: Option<String>,
    /// Wall-clock time as `HH:MM`
    pub at: Option<String>,
    #[serde(default)]
    pub refresh: bool,
}

/// GET /student/schedule
///
/// The caller's full week plus its time-slot bands.
pub async fn get_student_schedule(
    State(s): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    Query(params): Query<RefreshParams>,
) -> Response {
    let profile = match require_student_profile(&session) {
        Ok(profile) => profile,
        Err(resp) => return resp,
    };
    info!(session = %session.key(), "GET /student/schedule");

    let schedules = match s.schedules_for(&session, params.refresh).await {
        Ok(schedules) => schedules,
        Err(e) => return schedule_error_to_response(e),
    };

    match schedule::match_student_schedule(&schedules, profile) {
        Some(found) => (
            StatusCode::OK,
            Json(json!({
                "published": true,
                "schedule": found,
                "time_slots": schedule::distinct_time_slots(found),
            })),
        )
            .into_response(),
        None => not_published(),
    }
}

/// GET /student/today
///
/// Today's periods, the one in progress and those still ahead.
///
/// Query parameters:
/// - `day` (optional): weekday name to project instead of today
/// - `at` (optional): `HH:MM` to use instead of the current time
pub async fn get_today(
    State(s): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<TodayQuery>,
) -> Response {
    let profile = match require_student_profile(&session) {
        Ok(profile) => profile,
        Err(resp) => return resp,
    };

    let local_now = Local::now();
    let now = match query.at.as_deref() {
        Some(raw) => match parse_clock_strict(raw) {
            Some(clock) => clock,
            None => {
                return ApiErrorType::from((
                    StatusCode::BAD_REQUEST,
                    "`at` must be a 24-hour HH:MM time",
                    Some(raw.to_string()),
                ))
                .into_response()
            }
        },
        None => Clock::from(local_now.time()),
    };
    let day = query
        .day
        .clone()
        .unwrap_or_else(|| schedule::weekday_name(local_now.weekday()).to_string());

    info!(session = %session.key(), "GET /student/today day={} at={:02}:{:02}", day, now.hour, now.minute);

    let schedules = match s.schedules_for(&session, query.refresh).await {
        Ok(schedules) => schedules,
        Err(e) => return schedule_error_to_response(e),
    };

    match schedule::match_student_schedule(&schedules, profile) {
        Some(found) => {
            let projection = schedule::project_day(found, &day, now);
            debug!(
                periods = projection.today.len(),
                active_index = ?projection.active_index,
                upcoming = projection.upcoming.len(),
                "Projected day"
            );
            (
                StatusCode::OK,
                Json(json!({
                    "published": true,
                    "projection": projection,
                })),
            )
                .into_response()
        }
        None => not_published(),
    }
}
