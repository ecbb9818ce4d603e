use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::InvalidCriterion;
use serde::Serialize;

use crate::aggregator::AggregateError;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Always `false`.
    #[schema(example = false)]
    pub success: bool,
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `NOT_FOUND`,
    /// `PARTIAL_RECORD`, `UPSTREAM_ERROR`, `INTERNAL_ERROR`.
    #[schema(example = "NOT_FOUND")]
    pub code: &'static str,
    /// Short summary of what failed.
    #[schema(example = "Error fetching FIR from blockchain")]
    pub message: String,
    /// Detail of the underlying failure.
    #[schema(example = "FIR 999 not found")]
    pub error: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    NotFound(String),
    /// Ledger entry exists but its details could not be fetched.
    PartialRecord(String),
    /// Blob store or ledger unavailable or misbehaving.
    Upstream {
        message: &'static str,
        detail: String,
    },
    /// A filing step (pin or commit) failed. Reported as 500 to filing clients.
    SubmissionFailed {
        message: &'static str,
        detail: String,
    },
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        let (status, code, message, error) = match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "Invalid request".to_string(),
                msg,
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "FIR not found".to_string(),
                msg,
            ),
            AppError::PartialRecord(detail) => {
                tracing::warn!("Partial record: {}", detail);
                (
                    StatusCode::BAD_GATEWAY,
                    "PARTIAL_RECORD",
                    "FIR details are temporarily unavailable".to_string(),
                    detail,
                )
            }
            AppError::Upstream { message, detail } => {
                tracing::error!("Upstream failure: {}: {}", message, detail);
                (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_ERROR",
                    message.to_string(),
                    detail,
                )
            }
            AppError::SubmissionFailed { message, detail } => {
                tracing::error!("Submission failed: {}: {}", message, detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "UPSTREAM_ERROR",
                    message.to_string(),
                    detail,
                )
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An unexpected error occurred".to_string(),
                    "Internal server error".to_string(),
                )
            }
        };

        (
            status,
            ErrorBody {
                success: false,
                code,
                message,
                error,
            },
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<AggregateError> for AppError {
    fn from(err: AggregateError) -> Self {
        match err {
            AggregateError::InvalidSubmission(e) => AppError::Validation(e.to_string()),
            AggregateError::NotFound(_) => AppError::NotFound(err.to_string()),
            AggregateError::PartialRecord { .. } => AppError::PartialRecord(err.to_string()),
            AggregateError::Pin(_) => AppError::SubmissionFailed {
                message: "Error uploading FIR",
                detail: err.to_string(),
            },
            AggregateError::Commit(_) => AppError::SubmissionFailed {
                message: "Error saving FIR on blockchain",
                detail: err.to_string(),
            },
            AggregateError::Ledger(_) => AppError::Upstream {
                message: "Error fetching FIRs from blockchain",
                detail: err.to_string(),
            },
        }
    }
}

impl From<InvalidCriterion> for AppError {
    fn from(err: InvalidCriterion) -> Self {
        AppError::Validation(err.to_string())
    }
}
