//! Shared API error type and its mapping from ledger errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use frontdesk_ledger::LedgerError;
use thiserror::Error;

/// Errors returned by API handlers, rendered as `{"error": message}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match &err {
            LedgerError::SlotConflict
            | LedgerError::DuplicatePhone(_)
            | LedgerError::SummaryExists(_) => ApiError::Conflict(err.to_string()),
            LedgerError::UserNotFound(_) | LedgerError::AppointmentNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            LedgerError::AlreadyCancelled(_)
            | LedgerError::InvalidPhone(_)
            | LedgerError::InvalidDuration => ApiError::BadRequest(err.to_string()),
            LedgerError::Corrupt(_)
            | LedgerError::Db(_)
            | LedgerError::Pool(_)
            | LedgerError::Join(_) => {
                tracing::error!(error = %err, "ledger failure");
                ApiError::InternalServerError("storage failure".to_string())
            }
        }
    }
}
