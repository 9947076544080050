use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::server::types::ApiErrorType;
use crate::session::{SessionContext, SessionError};

/// Resolves the caller's `SessionContext` once and attaches it to the request.
///
/// Handlers behind this layer take it with `Extension<SessionContext>`.
pub async fn resolve_session(mut req: Request, next: Next) -> Response {
    match SessionContext::from_headers(req.headers()) {
        Ok(session) => {
            req.extensions_mut().insert(session);
            next.run(req).await
        }
        Err(e) => {
            warn!(path = %req.uri().path(), error = %e, "Rejected request without a usable session");
            let status = match &e {
                SessionError::MissingToken => StatusCode::UNAUTHORIZED,
                SessionError::UnknownRole(_) => StatusCode::BAD_REQUEST,
            };
            ApiErrorType::from((status, "Session could not be resolved", Some(e.to_string())))
                .into_response()
        }
    }
}
