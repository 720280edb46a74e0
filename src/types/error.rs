//! Error types for signlearn
//!
//! One taxonomy for the whole service. Each variant maps to exactly one HTTP
//! status and renders as the `{message, error?}` body.

use hyper::StatusCode;
use serde::Serialize;

/// Main error type for platform operations
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    /// Transient store I/O failure. Not retried by the engine.
    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlatformError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Body for the error response.
    ///
    /// Client errors carry only a message. Server errors keep a stable
    /// message and put the detail in `error`.
    pub fn to_response(&self) -> ErrorResponse {
        match self {
            Self::Store(detail) => ErrorResponse {
                message: "Database error".to_string(),
                error: Some(detail.clone()),
            },
            Self::Internal(detail) => ErrorResponse {
                message: "Internal server error".to_string(),
                error: Some(detail.clone()),
            },
            other => ErrorResponse {
                message: other.to_string(),
                error: None,
            },
        }
    }
}

/// Error body returned by every endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<std::io::Error> for PlatformError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for PlatformError {
    fn from(err: serde_json::Error) -> Self {
        Self::Validation(format!("Invalid JSON: {}", err))
    }
}

impl From<mongodb::error::Error> for PlatformError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Store(err.to_string())
    }
}

impl From<bson::ser::Error> for PlatformError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Internal(format!("BSON serialization failed: {}", err))
    }
}

/// Result type alias for platform operations
pub type Result<T> = std::result::Result<T, PlatformError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            PlatformError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PlatformError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            PlatformError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            PlatformError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            PlatformError::Store("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_client_errors_have_no_detail() {
        let body = PlatformError::NotFound("Course not found".into()).to_response();
        assert_eq!(body.message, "Course not found");
        assert!(body.error.is_none());

        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_store_errors_keep_detail() {
        let body = PlatformError::Store("connection reset".into()).to_response();
        assert_eq!(body.message, "Database error");
        assert_eq!(body.error.as_deref(), Some("connection reset"));
    }
}
