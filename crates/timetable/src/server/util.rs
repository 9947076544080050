use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::schedule::{ScheduleError, StudentProfile};
use crate::server::types::ApiErrorType;
use crate::session::{Role, SessionContext};

pub const NOT_PUBLISHED_MESSAGE: &str = "No schedule has been published for this cohort yet.";

/// The normal "nothing to show yet" answer. Deliberately a 200.
pub fn not_published() -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "published": false,
            "message": NOT_PUBLISHED_MESSAGE,
        })),
    )
        .into_response()
}

/// Maps schedule source failures onto HTTP responses.
pub fn schedule_error_to_response(error: ScheduleError) -> Response {
    let (status, message) = match &error {
        ScheduleError::SessionRejected { .. } => (
            StatusCode::UNAUTHORIZED,
            "Backend rejected the session - please sign in again",
        ),
        ScheduleError::CircuitBreakerOpen => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Schedule backend temporarily unavailable due to repeated failures",
        ),
        ScheduleError::Network { .. }
        | ScheduleError::UnexpectedResponse { .. }
        | ScheduleError::Parse { .. }
        | ScheduleError::Url { .. } => (StatusCode::BAD_GATEWAY, "Failed to fetch schedules"),
        ScheduleError::Io { .. } | ScheduleError::Config { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Schedule source is misconfigured",
        ),
    };

    ApiErrorType::from((status, message, Some(error.to_string()))).into_response()
}

/// Admin and department dashboards only.
pub fn require_staff(session: &SessionContext) -> Result<(), Response> {
    match session.role {
        Role::Admin | Role::Department => Ok(()),
        Role::Student => Err(forbidden("This view is only available to staff")),
    }
}

/// Student views need a student caller whose cohort headers were all present.
pub fn require_student_profile(session: &SessionContext) -> Result<&StudentProfile, Response> {
    if session.role != Role::Student {
        return Err(forbidden("This view is only available to students"));
    }
    session
        .profile
        .as_ref()
        .ok_or_else(|| forbidden("Session carries no complete student profile"))
}

fn forbidden(message: &str) -> Response {
    ApiErrorType::from((StatusCode::FORBIDDEN, message, None)).into_response()
}
