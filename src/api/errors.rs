use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::application::AppError;

use super::dto::STATUS_ERROR;

/// Error response: `{"returnStatus": "E", "returnMessage": ..., "error": ...}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_request", message)
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        let (status, code) = match &err {
            AppError::MissingField(_) => (StatusCode::BAD_REQUEST, "missing_field"),
            AppError::MissingIdentifier => (StatusCode::BAD_REQUEST, "missing_identifier"),
            AppError::InvalidAmount(_) => (StatusCode::BAD_REQUEST, "invalid_amount"),
            AppError::UserNotFound(_) => (StatusCode::NOT_FOUND, "user_not_found"),
            AppError::NoTransactionsFound(_) => (StatusCode::NOT_FOUND, "no_transactions"),
            AppError::TransactionNotFound(_) => (StatusCode::NOT_FOUND, "transaction_not_found"),
            AppError::TransactionAlreadyReversed { .. } => (StatusCode::CONFLICT, "already_reversed"),
            AppError::CannotReverseReversal(_) => (StatusCode::CONFLICT, "reversal_not_reversible"),
            AppError::BalanceOverflow(_) => (StatusCode::UNPROCESSABLE_ENTITY, "balance_out_of_range"),
            AppError::StoreWriteFailure(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_write_failure"),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
        };

        if status.is_server_error() {
            tracing::error!(error = %err, "request failed");
        } else {
            tracing::debug!(error = %err, "request rejected");
        }

        Self::new(status, code, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({
                "returnStatus": STATUS_ERROR,
                "returnMessage": self.message,
                "error": self.code,
            })),
        )
            .into_response()
    }
}
