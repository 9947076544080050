use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use timetable::config::ServerConfig;
use timetable::schedule::WeeklySchedule;
use timetable::server::{create_router, NOT_PUBLISHED_MESSAGE};
use timetable::types::AppState;
use tower::ServiceExt;

fn fixture_schedules() -> Vec<WeeklySchedule> {
    serde_json::from_value(json!([
        {
            "department_id": 4,
            "batch": 2021,
            "semester": 6,
            "section": "B",
            "days": [
                {
                    "day_of_week": "Monday",
                    "courses": [
                        { "course_name": "Compilers", "course_code": "CSE-3201", "instructor_name": "N. Haque",
                          "block_code": "A", "room_number": 402, "startTime": "10:00", "endTime": "11:30" },
                        { "course_name": "Networks", "course_code": "CSE-3203", "instructor_name": "S. Akter",
                          "block_code": "A", "room_number": "405", "startTime": "08:00", "endTime": "09:30" }
                    ]
                },
                {
                    "day_of_week": "Wednesday",
                    "courses": [
                        { "course_name": "Networks Lab", "course_code": "CSE-3204", "instructor_name": "S. Akter",
                          "startTime": "13:00", "endTime": "15:00" }
                    ]
                }
            ]
        },
        { "department_id": "4", "batch": "2021", "semester": "6", "section": "A", "days": [] }
    ]))
    .expect("fixture parses")
}

fn app() -> Router {
    create_router(Arc::new(AppState::with_schedules(fixture_schedules())))
}

fn student_request(uri: &str, section: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("authorization", "Bearer student-token")
        .header("x-user-role", "student")
        .header("x-student-department", "4")
        .header("x-student-batch", "2021")
        .header("x-student-semester", "6")
        .header("x-student-section", section)
        .body(Body::empty())
        .expect("request")
}

fn staff_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("authorization", "Bearer staff-token")
        .header("x-user-role", "department")
        .body(Body::empty())
        .expect("request")
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.expect("response");
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.expect("body");
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_health_needs_no_session() {
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(app(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let req = Request::builder()
        .uri("/student/schedule")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_student_schedule_with_time_slots() {
    let (status, body) = send(app(), student_request("/student/schedule", "B")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["published"], true);
    assert_eq!(body["schedule"]["department_id"], "4");
    assert_eq!(
        body["time_slots"],
        json!([
            { "start": "08:00", "end": "09:30" },
            { "start": "10:00", "end": "11:30" },
            { "start": "13:00", "end": "15:00" }
        ])
    );
}

#[tokio::test]
async fn test_unpublished_cohort_is_not_an_error() {
    let (status, body) = send(app(), student_request("/student/schedule", "Z")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["published"], false);
    assert_eq!(body["message"], NOT_PUBLISHED_MESSAGE);
}

#[tokio::test]
async fn test_today_projection_mid_morning() {
    let (status, body) = send(
        app(),
        student_request("/student/today?day=Monday&at=08:30", "B"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let projection = &body["projection"];
    assert_eq!(projection["day"], "Monday");
    assert_eq!(projection["today"].as_array().map(Vec::len), Some(2));
    assert_eq!(projection["active_index"], 1);
    assert_eq!(projection["current"]["course_code"], "CSE-3203");
    assert_eq!(projection["upcoming"][0]["course_code"], "CSE-3201");
    assert_eq!(projection["upcoming"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_today_on_a_free_day_is_empty() {
    let (status, body) = send(
        app(),
        student_request("/student/today?day=Sunday&at=10:00", "B"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let projection = &body["projection"];
    assert_eq!(projection["today"], json!([]));
    assert!(projection["current"].is_null());
    assert_eq!(projection["upcoming"], json!([]));
}

#[tokio::test]
async fn test_today_rejects_bad_time_override() {
    let (status, _) = send(
        app(),
        student_request("/student/today?day=Monday&at=8.30", "B"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_student_without_profile_is_forbidden() {
    let req = Request::builder()
        .uri("/student/today")
        .header("authorization", "Bearer student-token")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app(), req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_students_cannot_list_all_schedules() {
    let (status, _) = send(app(), student_request("/schedules", "B")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_staff_lists_schedules() {
    let (status, body) = send(app(), staff_request("/schedules")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_staff_lookup_includes_summary() {
    let (status, body) = send(
        app(),
        staff_request("/schedules/lookup?department_id=4&batch=2021&semester=6&section=B"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["published"], true);
    assert_eq!(body["summary"]["total_periods"], 3);
    assert_eq!(body["summary"]["distinct_instructors"], 2);
    assert_eq!(body["summary"]["scheduled_days"], 2);
}

#[tokio::test]
async fn test_staff_time_slots_for_unknown_cohort() {
    let (status, body) = send(
        app(),
        staff_request("/schedules/time_slots?department_id=9&batch=2021&semester=6&section=B"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["published"], false);
}

#[tokio::test]
async fn test_cache_stats_for_static_source() {
    let (status, body) = send(app(), staff_request("/cache/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cached"], false);
}

/// Backend app state pointed at a stub that refuses every token.
async fn rejecting_backend_app() -> Router {
    let backend = Router::new().route(
        "/api/schedules",
        axum::routing::get(|| async { StatusCode::UNAUTHORIZED }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, backend).await.unwrap();
    });

    let config = ServerConfig::from_lookup(|key| match key {
        "TIMETABLE_BACKEND_URL" => Some(base_url.clone()),
        _ => None,
    })
    .unwrap();
    create_router(Arc::new(AppState::from_config(&config).unwrap()))
}

#[tokio::test]
async fn test_backend_rejected_session_is_unauthorized() {
    let app = rejecting_backend_app().await;
    let (status, body) = send(app.clone(), student_request("/student/schedule", "B")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["context"].as_str().unwrap().contains("401"));

    // Rejections leave the breaker closed
    let (status, body) = send(app, staff_request("/cache/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cached"], json!(true));
    assert_eq!(body["stats"]["breaker_open"], json!(false));
    assert_eq!(body["stats"]["session_locks"], json!(0));
}
