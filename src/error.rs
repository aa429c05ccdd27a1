// Error type shared by the parser, estimator, ledger and HTTP handlers

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Everything that can go wrong while handling a footprint request.
#[derive(Debug, Error)]
pub enum AppError {
    /// Required submission fields are absent, null or blank.
    #[error("missing required fields: {}", .missing.join(", "))]
    Validation { missing: Vec<&'static str> },

    /// The request body is not a well-formed submission.
    #[error("invalid submission: {0}")]
    InvalidSubmission(String),

    /// The estimator reply does not follow the expected grammar.
    #[error("malformed estimator response: {0}")]
    MalformedResponse(String),

    #[error("estimator request failed: {0}")]
    Upstream(String),

    #[error("estimator did not answer within {0:?}")]
    UpstreamTimeout(Duration),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("write conflict: {0}")]
    WriteConflict(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } | AppError::InvalidSubmission(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::WriteConflict(_) => StatusCode::CONFLICT,
            AppError::StorageUnavailable(_) | AppError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::MalformedResponse(_) | AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

/// Classify a sqlx failure into the ledger error taxonomy.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => AppError::StorageUnavailable(err.to_string()),
            sqlx::Error::Database(db)
                if matches!(db.code().as_deref(), Some("40001" | "40P01" | "23505")) =>
            {
                AppError::WriteConflict(err.to_string())
            }
            _ => AppError::Storage(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }

        let body = match &self {
            AppError::Validation { missing } => json!({
                "error": self.to_string(),
                "missing_fields": missing,
            }),
            // Database details stay in the logs.
            AppError::StorageUnavailable(_) => json!({ "error": "Database connection failed" }),
            AppError::Storage(_) => json!({ "error": "Database error" }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
