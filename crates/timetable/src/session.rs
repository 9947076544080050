//! Per-request session context.
//!
//! Authentication happens upstream; whatever sits in front of this service
//! forwards the bearer token and the caller's role and cohort as headers. The
//! context is resolved once per request by middleware and handed to handlers
//! as a typed extension.

use crate::schedule::cache::SessionKey;
use crate::schedule::{LooseId, StudentProfile};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use serde::Serialize;
use thiserror::Error;

pub const ROLE_HEADER: &str = "x-user-role";
pub const DEPARTMENT_HEADER: &str = "x-student-department";
pub const BATCH_HEADER: &str = "x-student-batch";
pub const SEMESTER_HEADER: &str = "x-student-semester";
pub const SECTION_HEADER: &str = "x-student-section";

/// Which dashboard the caller is entitled to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Department,
    Student,
}

impl Role {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "department" => Some(Role::Department),
            "student" => Some(Role::Student),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("missing or malformed Authorization header")]
    MissingToken,

    #[error("unknown role `{0}`")]
    UnknownRole(String),
}

/// The resolved caller of one request.
#[derive(Debug, Clone)]
pub struct SessionContext {
    token: String,
    pub role: Role,
    /// Present only when all four cohort headers were supplied.
    pub profile: Option<StudentProfile>,
}

impl SessionContext {
    pub fn new(token: impl Into<String>, role: Role, profile: Option<StudentProfile>) -> Self {
        Self {
            token: token.into(),
            role,
            profile,
        }
    }

    /// Resolves the context from forwarded request headers.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, SessionError> {
        let token = header_str(headers, AUTHORIZATION.as_str())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(SessionError::MissingToken)?;

        let role = match header_str(headers, ROLE_HEADER) {
            Some(raw) => Role::parse(raw).ok_or_else(|| SessionError::UnknownRole(raw.to_string()))?,
            None => Role::Student,
        };

        let profile = match (
            header_str(headers, DEPARTMENT_HEADER),
            header_str(headers, BATCH_HEADER),
            header_str(headers, SEMESTER_HEADER),
            header_str(headers, SECTION_HEADER),
        ) {
            (Some(department), Some(batch), Some(semester), Some(section)) => Some(StudentProfile {
                department_id: LooseId::new(department.trim()),
                batch: LooseId::new(batch.trim()),
                semester: LooseId::new(semester.trim()),
                section: LooseId::new(section.trim()),
            }),
            _ => None,
        };

        Ok(Self::new(token, role, profile))
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn key(&self) -> SessionKey {
        SessionKey::from_token(&self.token)
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
