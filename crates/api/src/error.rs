//! Error responses for the HTTP gateway

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use commitd_coordinator::CoordinatorError;
use serde_json::json;
use thiserror::Error;

/// Result type for API handlers
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Errors surfaced to HTTP clients as `{ok: false, error}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CoordinatorError> for ApiError {
    fn from(err: CoordinatorError) -> Self {
        match err {
            CoordinatorError::DuplicateTransaction(txid) => {
                ApiError::Conflict(format!("transaction {txid} already exists"))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({ "ok": false, "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_transaction_maps_to_conflict() {
        let err: ApiError =
            CoordinatorError::DuplicateTransaction(commitd_types::TxId::from("tx-1")).into();
        assert!(matches!(err, ApiError::Conflict(_)));
    }
}
