//! API error handling
//!
//! Every error is returned as `{"code": <i32>, "msg": <string>}` with a
//! matching HTTP status.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use mlmart_db::DbError;
use mlmart_ledger::LedgerError;

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    // =========================================================================
    // Request Errors (-1100 to -1199)
    // =========================================================================
    #[error("Invalid request body: {0}")]
    InvalidRequestBody(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    // =========================================================================
    // Order Errors (-2000 to -2099)
    // =========================================================================
    #[error("{0}")]
    OrderNotFound(String),

    #[error("{0}")]
    OrderItemNotFound(String),

    #[error("{0}")]
    InvalidTransition(String),

    // =========================================================================
    // Member Errors (-3000 to -3099)
    // =========================================================================
    #[error("{0}")]
    UserNotFound(String),

    #[error("{0}")]
    AlreadyExists(String),

    // =========================================================================
    // Wallet Errors (-4000 to -4099)
    // =========================================================================
    #[error("{0}")]
    WalletNotFound(String),

    // =========================================================================
    // Internal Errors (-5000 to -5099)
    // =========================================================================
    #[error("Internal server error")]
    InternalError,

    #[error("Service unavailable, retry later")]
    ServiceUnavailable,

    #[error("Database error")]
    DatabaseError,
}

impl ApiError {
    pub fn error_code(&self) -> i32 {
        match self {
            Self::InvalidRequestBody(_) => -1100,
            Self::InvalidParameter(_) | Self::ValidationError(_) => -1102,

            Self::OrderNotFound(_) => -2013,
            Self::OrderItemNotFound(_) => -2014,
            Self::InvalidTransition(_) => -2021,

            Self::UserNotFound(_) => -3001,
            Self::AlreadyExists(_) => -3004,

            Self::WalletNotFound(_) => -4001,

            Self::InternalError => -5000,
            Self::ServiceUnavailable => -5001,
            Self::DatabaseError => -5002,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) | Self::InvalidParameter(_) | Self::ValidationError(_) => {
                StatusCode::BAD_REQUEST
            }

            Self::OrderNotFound(_)
            | Self::OrderItemNotFound(_)
            | Self::UserNotFound(_)
            | Self::WalletNotFound(_) => StatusCode::NOT_FOUND,

            Self::InvalidTransition(_) | Self::AlreadyExists(_) => StatusCode::CONFLICT,

            Self::InternalError | Self::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,

            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Error response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: i32,
    pub msg: String,
}

impl From<&ApiError> for ErrorResponse {
    fn from(err: &ApiError) -> Self {
        Self {
            code: err.error_code(),
            msg: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut response = (status, Json(ErrorResponse::from(&self))).into_response();

        if matches!(self, ApiError::ServiceUnavailable) {
            response
                .headers_mut()
                .insert("Retry-After", axum::http::HeaderValue::from_static("1"));
        }

        response
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        let msg = err.to_string();
        match err {
            LedgerError::OrderNotFound(_) => Self::OrderNotFound(msg),
            LedgerError::OrderItemNotFound(_) => Self::OrderItemNotFound(msg),
            LedgerError::UserNotFound(_) => Self::UserNotFound(msg),
            LedgerError::WalletNotFound(_) => Self::WalletNotFound(msg),
            LedgerError::InvalidTransition { .. } => Self::InvalidTransition(msg),
            LedgerError::InvalidInput(m) => Self::InvalidParameter(m),
            LedgerError::Duplicate(m) => Self::AlreadyExists(m),
            LedgerError::CorruptRecord(e) => {
                tracing::error!(error = %e, "Corrupt record in storage");
                Self::InternalError
            }
            LedgerError::Storage(e) => Self::from(e),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        if err.is_retryable() {
            tracing::warn!(error = %err, "Retryable storage failure");
            return Self::ServiceUnavailable;
        }
        tracing::error!(error = ?err, "Database error");
        match err {
            DbError::Duplicate(msg) => Self::AlreadyExists(msg),
            DbError::InvalidInput(msg) | DbError::Constraint(msg) => Self::InvalidParameter(msg),
            _ => Self::DatabaseError,
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ValidationError(format_validation_errors(&err))
    }
}

/// Flatten validation errors into `field: message` pairs
pub(crate) fn format_validation_errors(errors: &validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "invalid".to_string());
                format!("{}: {}", field, message)
            })
        })
        .collect();
    messages.sort();
    messages.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_ledger_error_mapping() {
        let err = ApiError::from(LedgerError::OrderNotFound(Uuid::nil()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.error_code(), -2013);

        let err = ApiError::from(LedgerError::InvalidTransition {
            entity: "order",
            id: Uuid::nil(),
            from: "cancelled".to_string(),
            to: "completed".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        let err = ApiError::from(LedgerError::Duplicate("phone".to_string()));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_retryable_storage_is_unavailable() {
        let err = ApiError::from(LedgerError::Storage(DbError::Transaction(
            "serialization failure".to_string(),
        )));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let err = ApiError::from(DbError::Migration("bad".to_string()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
