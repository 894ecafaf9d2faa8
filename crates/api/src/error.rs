//! API error types with HTTP response mapping.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::LedgerError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Error raised by a ledger operation.
    Ledger(LedgerError),
    /// The request body could not be read as the expected JSON shape.
    BadRequest(String),
    /// The path does not identify a record.
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Ledger(err) => ledger_error_to_response(err),
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": "validation_error", "message": msg }),
            ),
            ApiError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                serde_json::json!({ "error": "not_found", "message": msg }),
            ),
        };

        (status, axum::Json(body)).into_response()
    }
}

fn ledger_error_to_response(err: LedgerError) -> (StatusCode, serde_json::Value) {
    let kind = err.kind();
    let message = err.to_string();
    match err {
        LedgerError::Validation(errors) => (
            StatusCode::BAD_REQUEST,
            serde_json::json!({ "error": kind, "message": message, "fields": errors }),
        ),
        LedgerError::NotFound { .. } => (
            StatusCode::NOT_FOUND,
            serde_json::json!({ "error": kind, "message": message }),
        ),
        LedgerError::Reference { .. } => (
            StatusCode::CONFLICT,
            serde_json::json!({ "error": kind, "message": message }),
        ),
        LedgerError::Store(store_err) => {
            tracing::error!(error = %store_err, "internal server error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": kind, "message": "internal server error" }),
            )
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::NotFound(rejection.body_text())
    }
}
