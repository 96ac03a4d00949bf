//! Error types for the registry HTTP API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use sites_common::Error;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Caller identity headers missing or malformed (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Request body or query could not be interpreted (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Domain error from the registry services
    #[error(transparent)]
    Registry(#[from] Error),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Registry(err) => match err {
                Error::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                Error::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                Error::ConcurrentCreationConflict { .. } => {
                    (StatusCode::CONFLICT, "CONCURRENT_CREATION_CONFLICT")
                }
                Error::AlreadyExists { .. } => (StatusCode::CONFLICT, "ALREADY_EXISTS"),
                Error::ConflictState(_) => (StatusCode::CONFLICT, "CONFLICT_STATE"),
                Error::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
                Error::Database(_)
                | Error::Io(_)
                | Error::Serialization(_)
                | Error::Config(_)
                | Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            },
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, ApiError::Registry(err) if err.is_retryable())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.parts();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
                "retryable": self.retryable(),
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
    use sites_common::EntityKind;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::NotFound("platform 9".into()), StatusCode::NOT_FOUND),
            (Error::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (Error::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (Error::ConflictState("busy".into()), StatusCode::CONFLICT),
            (
                Error::ConcurrentCreationConflict {
                    entity: EntityKind::Platform,
                    name: "LON_AGR_TWR02".into(),
                },
                StatusCode::CONFLICT,
            ),
            (Error::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_only_creation_conflicts_are_retryable() {
        let conflict = ApiError::from(Error::ConcurrentCreationConflict {
            entity: EntityKind::Instrument,
            name: "X".into(),
        });
        assert!(conflict.retryable());
        assert!(!ApiError::from(Error::ConflictState("x".into())).retryable());
    }
}
