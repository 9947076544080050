//! Error types for loading and fetching schedules.
//!
//! The projector itself never fails; these cover everything around it.

use thiserror::Error;

/// Errors that can occur while obtaining schedule data.
#[derive(Debug, Error, Clone)]
pub enum ScheduleError {
    /// Network/HTTP request failed
    #[error("Network error: {message}")]
    Network { message: String },

    /// Backend refused the session's token
    #[error("Backend rejected session (status {status})")]
    SessionRejected { status: u16 },

    /// Backend returned something other than a schedule list
    #[error("Unexpected response: {message}")]
    UnexpectedResponse { message: String },

    /// Schedule JSON could not be decoded
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// Reading a schedule file failed
    #[error("I/O error: {message}")]
    Io { message: String },

    /// URL parsing/construction failed
    #[error("URL error: {message}")]
    Url { message: String },

    /// Circuit breaker is open due to repeated failures
    #[error("Circuit breaker open - too many recent backend failures")]
    CircuitBreakerOpen,

    /// An environment variable held an invalid value
    #[error("Invalid configuration for {key}: {message}")]
    Config { key: String, message: String },
}

impl ScheduleError {
    /// Returns true if this error is potentially transient and retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ScheduleError::Network { .. } | ScheduleError::UnexpectedResponse { .. }
        )
    }
}

impl From<reqwest::Error> for ScheduleError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ScheduleError::Parse {
                message: err.to_string(),
            }
        } else {
            ScheduleError::Network {
                message: err.to_string(),
            }
        }
    }
}

impl From<url::ParseError> for ScheduleError {
    fn from(err: url::ParseError) -> Self {
        ScheduleError::Url {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for ScheduleError {
    fn from(err: std::io::Error) -> Self {
        ScheduleError::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ScheduleError {
    fn from(err: serde_json::Error) -> Self {
        ScheduleError::Parse {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ScheduleError::Network { message: "reset".into() }.is_retryable());
        assert!(!ScheduleError::SessionRejected { status: 401 }.is_retryable());
        assert!(ScheduleError::UnexpectedResponse { message: "500".into() }.is_retryable());
        assert!(!ScheduleError::Parse { message: "eof".into() }.is_retryable());
        assert!(!ScheduleError::CircuitBreakerOpen.is_retryable());
    }

    #[test]
    fn test_json_error_becomes_parse() {
        let err: ScheduleError = serde_json::from_str::<Vec<u8>>("{").unwrap_err().into();
        assert!(matches!(err, ScheduleError::Parse { .. }));
    }
}
