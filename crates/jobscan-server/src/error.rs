use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use jobscan_core::error::AppError;

use crate::dto::ErrorResponse;

/// Errors a handler can return.
#[derive(Debug)]
pub enum ApiError {
    App(AppError),
    NotFound(String),
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self::App(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::App(err) => match &err {
                AppError::ValidationError(_) => {
                    (StatusCode::BAD_REQUEST, "validation_error", err.to_string())
                }
                AppError::SerializationError(_) => {
                    (StatusCode::BAD_REQUEST, "invalid_body", err.to_string())
                }
                AppError::Timeout(_) => {
                    tracing::error!(error = %err, "Harvest deadline exceeded");
                    (
                        StatusCode::GATEWAY_TIMEOUT,
                        "timeout",
                        "Job fetching took too long. Please try again.".to_string(),
                    )
                }
                AppError::DatabaseError(_) => {
                    tracing::error!(error = %err, "Store operation failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "database_error",
                        "Failed to store or retrieve jobs. Please try again.".to_string(),
                    )
                }
                _ => {
                    tracing::error!(error = %err, "Request failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal_error",
                        "Failed to fetch jobs. Please try again.".to_string(),
                    )
                }
            },
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        (status, axum::Json(body)).into_response()
    }
}
