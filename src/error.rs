//! Gateway error types with HTTP status code mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Gateway error type covering every caller-visible failure.
///
/// Each variant maps to a stable wire code (`code()`) and an HTTP status
/// (`status_code()`). Messages are safe to display; storage-level detail is
/// reduced to a sanitized message string before it reaches a variant.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Unknown content type
    #[error("Invalid content type: {0}")]
    InvalidType(String),

    /// Object not found (404)
    #[error("{0}")]
    NotFound(String),

    /// Authenticated but lacking the required capability (403)
    #[error("{0}")]
    Forbidden(String),

    /// Missing or unusable identity assertion (401)
    #[error("{0}")]
    Unauthorized(String),

    /// Field validation failure, carries per-field message lists
    #[error("Field validation failed")]
    ValidationFailed(BTreeMap<String, Vec<String>>),

    /// Upload rejected before reaching storage (bad type, size, no file)
    #[error("Upload error: {0}")]
    UploadError(String),

    /// Upload accepted but storage failed to persist it
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    /// Underlying store rejected a create
    #[error("Create failed: {0}")]
    CreateFailed(String),

    /// Underlying store rejected an update
    #[error("Update failed: {0}")]
    UpdateFailed(String),

    /// Underlying store rejected a delete
    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    /// Batch request contained no operations
    #[error("No operations provided")]
    NoOperations,

    /// Batch request exceeded the per-call operation cap
    #[error("Maximum {0} operations per batch")]
    TooManyOperations(usize),

    /// Unknown taxonomy passed to a term lookup
    #[error("Invalid taxonomy: {0}")]
    InvalidTaxonomy(String),

    /// Store-level failure while listing terms
    #[error("Terms error: {0}")]
    TermsError(String),

    /// Schema provider is not configured or unreachable
    #[error("Schema provider unavailable")]
    SchemaUnavailable,

    /// JSON parsing error in a request body
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal error with a sanitized message
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Stable wire code for the error body
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidType(_) => "invalid_type",
            ApiError::NotFound(_) => "not_found",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::ValidationFailed(_) => "validation_failed",
            ApiError::UploadError(_) => "upload_error",
            ApiError::UploadFailed(_) => "upload_failed",
            ApiError::CreateFailed(_) => "create_failed",
            ApiError::UpdateFailed(_) => "update_failed",
            ApiError::DeleteFailed(_) => "delete_failed",
            ApiError::NoOperations => "no_operations",
            ApiError::TooManyOperations(_) => "too_many_operations",
            ApiError::InvalidTaxonomy(_) => "invalid_taxonomy",
            ApiError::TermsError(_) => "terms_error",
            ApiError::SchemaUnavailable => "schema_unavailable",
            ApiError::Json(_) => "invalid_json",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Internal(_) => "internal_error",
        }
    }

    /// Map error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 - Bad Request (client errors)
            ApiError::InvalidType(_) => StatusCode::BAD_REQUEST,
            ApiError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            ApiError::UploadError(_) => StatusCode::BAD_REQUEST,
            ApiError::NoOperations => StatusCode::BAD_REQUEST,
            ApiError::TooManyOperations(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidTaxonomy(_) => StatusCode::BAD_REQUEST,
            ApiError::SchemaUnavailable => StatusCode::BAD_REQUEST,
            ApiError::Json(_) => StatusCode::BAD_REQUEST,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,

            // 401 / 403
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,

            // 404
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,

            // 500 - store-side failures surfaced with sanitized messages
            ApiError::UploadFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::CreateFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::UpdateFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::DeleteFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::TermsError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Create a not found error (404)
    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    /// Create a forbidden error (403)
    pub fn forbidden(msg: impl Into<String>) -> Self {
        ApiError::Forbidden(msg.into())
    }

    /// Create an unauthorized error (401)
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        ApiError::Unauthorized(msg.into())
    }

    /// Create a bad request error
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    /// Create an internal error with a sanitized message
    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::Internal(msg.into())
    }
}

/// JSON error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    /// Stable error code (e.g. "validation_failed")
    pub code: String,
    /// Human-readable message, safe to display
    pub message: String,
    /// HTTP status code
    pub status: u16,
    /// Per-field validation messages (validation_failed only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, Vec<String>>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let errors = match &self {
            ApiError::ValidationFailed(errors) => Some(errors.clone()),
            _ => None,
        };

        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
            status: status.as_u16(),
            errors,
        };

        let json = serde_json::to_string(&body).unwrap_or_else(|_| {
            format!(
                r#"{{"code":"{}","message":"{}","status":{}}}"#,
                self.code(),
                self,
                status.as_u16()
            )
        });

        (status, [("content-type", "application/json")], json).into_response()
    }
}

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::InvalidType("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::not_found("gone").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::forbidden("no").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::CreateFailed("db".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::TooManyOperations(50).code(),
            "too_many_operations"
        );
    }

    #[test]
    fn test_validation_errors_carried_in_body() {
        let mut errors = BTreeMap::new();
        errors.insert(
            "price".to_string(),
            vec!["Value must be at most 100.".to_string()],
        );
        let err = ApiError::ValidationFailed(errors);
        assert_eq!(err.code(), "validation_failed");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
