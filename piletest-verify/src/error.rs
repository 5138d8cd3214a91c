//! Error types for piletest-verify
//!
//! `EngineError` covers the reconciliation engine; nothing in it is fatal.
//! `ApiError` maps engine errors onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::Stage;
use crate::types::ExtractionError;

/// Engine error
#[derive(Debug, Error)]
pub enum EngineError {
    /// OCR collaborator unreachable; retryable, report untouched
    #[error("OCR service is unavailable, please retry")]
    ExtractionUnavailable,

    /// Collaborator reachable but failed or returned a malformed batch
    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    /// Workflow guard rejected a stage change
    #[error("Cannot move from {from} to {to}: {reason}")]
    IllegalTransition { from: Stage, to: Stage, reason: String },

    /// Operation not permitted in the current stage
    #[error("{operation} is not allowed in the {stage} stage")]
    InvalidStage { operation: &'static str, stage: Stage },

    /// Reading index out of range
    #[error("Reading {0} does not exist")]
    ReadingNotFound(usize),

    /// Uploaded source rejected at intake
    #[error("Invalid source: {0}")]
    InvalidSource(String),
}

impl From<ExtractionError> for EngineError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::Unreachable(_) => EngineError::ExtractionUnavailable,
            other => EngineError::ExtractionFailed(other.to_string()),
        }
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Engine error, status chosen per variant
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Engine(err) => match err {
                EngineError::ExtractionUnavailable => {
                    (StatusCode::SERVICE_UNAVAILABLE, "EXTRACTION_UNAVAILABLE")
                }
                EngineError::ExtractionFailed(_) => (StatusCode::BAD_GATEWAY, "EXTRACTION_FAILED"),
                EngineError::IllegalTransition { .. } => {
                    (StatusCode::CONFLICT, "ILLEGAL_TRANSITION")
                }
                EngineError::InvalidStage { .. } => (StatusCode::CONFLICT, "INVALID_STAGE"),
                EngineError::ReadingNotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                EngineError::InvalidSource(_) => (StatusCode::BAD_REQUEST, "INVALID_SOURCE"),
            },
        };

        let message = match &self {
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Engine(err) => err.to_string(),
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
    fn test_unreachable_maps_to_unavailable() {
        let err: EngineError = ExtractionError::Unreachable("connection refused".into()).into();
        assert!(matches!(err, EngineError::ExtractionUnavailable));
    }

    #[test]
    fn test_other_extraction_errors_map_to_failed() {
        let err: EngineError = ExtractionError::Api(500, "boom".into()).into();
        match err {
            EngineError::ExtractionFailed(msg) => assert!(msg.contains("500")),
            other => panic!("unexpected: {other:?}"),
        }

        let err: EngineError = ExtractionError::Malformed("missing readings".into()).into();
        assert!(matches!(err, EngineError::ExtractionFailed(_)));
    }

    #[test]
    fn test_illegal_transition_message_is_user_readable() {
        let err = EngineError::IllegalTransition {
            from: Stage::Verify,
            to: Stage::Finalize,
            reason: "at least one reading is required".into(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot move from verify to finalize: at least one reading is required"
        );
    }

    #[test]
    fn test_status_codes() {
        let resp = ApiError::from(EngineError::ExtractionUnavailable).into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let resp = ApiError::from(EngineError::ReadingNotFound(4)).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = ApiError::BadRequest("bad base64".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
