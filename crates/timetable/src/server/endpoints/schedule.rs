use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use super::RefreshParams;
use crate::schedule::{self, LooseId, StudentProfile};
use crate::server::util::{not_published, require_staff, schedule_error_to_response};
use crate::session::SessionContext;
use crate::types::AppState;

/// Cohort selector used by the department dashboard.
#[derive(Debug, Deserialize)]
pub struct CohortQuery {
    pub department_id: String,
    pub batch: String,
    pub semester: String,
    pub section: String,
    #[serde(default)]
    pub refresh: bool,
}

impl CohortQuery {
    fn profile(&self) -> StudentProfile {
        StudentProfile {
            department_id: LooseId::new(self.department_id.trim()),
            batch: LooseId::new(self.batch.trim()),
            semester: LooseId::new(self.semester.trim()),
            section: LooseId::new(self.section.trim()),
        }
    }
}

/// GET /schedules
///
/// Returns every weekly schedule visible to the caller.
pub async fn get_schedules(
    State(s): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    Query(params): Query<RefreshParams>,
) -> Response {
    if let Err(resp) = require_staff(&session) {
        return resp;
    }
    info!("GET /schedules (refresh={})", params.refresh);

    match s.schedules_for(&session, params.refresh).await {
        Ok(schedules) => (StatusCode::OK, Json(&*schedules)).into_response(),
        Err(e) => schedule_error_to_response(e),
    }
}

/// GET /schedules/lookup
///
/// Returns the schedule of one cohort together with its summary statistics.
pub async fn get_lookup(
    State(s): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<CohortQuery>,
) -> Response {
    if let Err(resp) = require_staff(&session) {
        return resp;
    }
    info!(
        "GET /schedules/lookup department={} batch={} semester={} section={}",
        query.department_id, query.batch, query.semester, query.section
    );

    let schedules = match s.schedules_for(&session, query.refresh).await {
        Ok(schedules) => schedules,
        Err(e) => return schedule_error_to_response(e),
    };

    match schedule::match_student_schedule(&schedules, &query.profile()) {
        Some(found) => (
            StatusCode::OK,
            Json(json!({
                "published": true,
                "schedule": found,
                "summary": schedule::summarize(found),
            })),
        )
            .into_response(),
        None => not_published(),
    }
}

/// GET /schedules/time_slots
///
/// Returns the distinct time-slot bands of one cohort's week.
pub async fn get_time_slots(
    State(s): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<CohortQuery>,
) -> Response {
    if let Err(resp) = require_staff(&session) {
        return resp;
    }
    info!("GET /schedules/time_slots section={}", query.section);

    let schedules = match s.schedules_for(&session, query.refresh).await {
        Ok(schedules) => schedules,
        Err(e) => return schedule_error_to_response(e),
    };

    match schedule::match_student_schedule(&schedules, &query.profile()) {
        Some(found) => (
            StatusCode::OK,
            Json(json!({
                "published": true,
                "time_slots": schedule::distinct_time_slots(found),
            })),
        )
            .into_response(),
        None => not_published(),
    }
}
