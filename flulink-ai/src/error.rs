//! Error types for flulink-ai
//!
//! Two layers:
//! - [`InferenceError`]: the taxonomy the inference core reports to its callers
//! - [`ApiError`]: HTTP-facing error with status code mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by the inference core
///
/// `Timeout` and `DependencyError` on the primary path are recovered by the
/// fallback when it is enabled; callers only see them when it is not, and then
/// as `ResourceUnavailable`.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InferenceError {
    /// Operation exceeded its deadline
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Dependency down or not ready, and fallback disabled
    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// Malformed request (unknown tier, out-of-range score, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Collaborator returned a non-success result
    #[error("Dependency error: {0}")]
    DependencyError(String),
}

impl From<flulink_common::Error> for InferenceError {
    fn from(err: flulink_common::Error) -> Self {
        match err {
            flulink_common::Error::InvalidInput(msg) => InferenceError::InvalidInput(msg),
            other => InferenceError::DependencyError(other.to_string()),
        }
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body that does not parse (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Inference core error
    #[error(transparent)]
    Inference(#[from] InferenceError),

    /// flulink-common error
    #[error("Common error: {0}")]
    Common(#[from] flulink_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Inference(ref err) => {
                let (status, code) = match err {
                    InferenceError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
                    InferenceError::ResourceUnavailable(_) => {
                        (StatusCode::SERVICE_UNAVAILABLE, "RESOURCE_UNAVAILABLE")
                    }
                    InferenceError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
                    InferenceError::DependencyError(_) => (StatusCode::BAD_GATEWAY, "DEPENDENCY_ERROR"),
                };
                (status, code, err.to_string())
            }
            ApiError::Common(ref err) => match err {
                flulink_common::Error::InvalidInput(_) => {
                    (StatusCode::BAD_REQUEST, "INVALID_INPUT", err.to_string())
                }
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "COMMON_ERROR",
                    err.to_string(),
                ),
            },
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inference_error_status_mapping() {
        let cases = [
            (InferenceError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (InferenceError::ResourceUnavailable("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (InferenceError::Timeout(Duration::from_secs(1)), StatusCode::GATEWAY_TIMEOUT),
            (InferenceError::DependencyError("x".into()), StatusCode::BAD_GATEWAY),
        ];

        for (err, expected) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_bad_request_status() {
        let response = ApiError::BadRequest("body".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_common_invalid_input_is_bad_request() {
        let err = ApiError::from(flulink_common::Error::InvalidInput("bad tier".into()));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);

        let err = ApiError::from(flulink_common::Error::Internal("boom".into()));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_common_error_converts_to_inference_error() {
        let err: InferenceError = flulink_common::Error::InvalidInput("tier".into()).into();
        assert!(matches!(err, InferenceError::InvalidInput(_)));
    }
}
