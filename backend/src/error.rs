//! Error types and error handling for the application
//!
//! This module defines custom error types that can be converted to HTTP responses.
//! All errors implement `IntoResponse` to provide consistent error formatting.

use crate::state::{PersistenceError, StopListError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error types
///
/// Nothing here is fatal: every variant leaves the stop list as it was
/// before the failing request.
#[derive(Error, Debug)]
pub enum AppError {
    /// Request input failed validation (blank address, bad time, empty upload)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation needs more stops than the route has
    #[error("At least {required} {unit} are required, found {actual}")]
    InsufficientStops {
        /// What is being counted, e.g. `stops` or `deliveries`
        unit: &'static str,
        /// Minimum number the operation needs
        required: usize,
        /// Number available
        actual: usize,
    },

    /// Stop with the given ID was not found
    #[error("Stop not found: {0}")]
    StopNotFound(String),

    /// Stop list rule violated (deleting the start stop, invalid sequence)
    #[error(transparent)]
    StopList(#[from] StopListError),

    /// External service replied with something other than the expected JSON
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// External service could not be reached or returned an error status
    #[error("Transport failure: {0}")]
    Transport(String),

    /// A required external service is not configured
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// An identical request is already in flight
    #[error("Busy: {0}")]
    Busy(String),

    /// Error occurred during state persistence
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Internal server error (catch-all for unexpected errors)
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InsufficientStops { .. } => StatusCode::BAD_REQUEST,
            AppError::StopNotFound(_) => StatusCode::NOT_FOUND,
            AppError::StopList(_) => StatusCode::BAD_REQUEST,
            AppError::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
            AppError::Transport(_) => StatusCode::BAD_GATEWAY,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Busy(_) => StatusCode::CONFLICT,
            AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() || status == StatusCode::BAD_GATEWAY {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::StopNotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(StopListError::StartStopProtected).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::MalformedResponse("x".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(AppError::Busy("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::Unavailable("x".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_insufficient_stops_message() {
        let error = AppError::InsufficientStops {
            unit: "deliveries",
            required: 2,
            actual: 1,
        };
        assert_eq!(
            error.to_string(),
            "At least 2 deliveries are required, found 1"
        );
    }

    #[test]
    fn test_into_response_status() {
        let response = AppError::Busy("optimizing".into()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
