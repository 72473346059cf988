//! Error handling
//!
//! Every error the service can produce, and how each one maps onto an HTTP
//! response.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(#[from] validator::ValidationErrors),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("State conflict: {0}")]
    StateConflict(String),

    #[error("Dependency unavailable: {0}")]
    DependencyUnavailable(String),

    #[error("Persistence failure: {0}")]
    Persistence(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::NotFound("Row not found".to_string()),
            other => AppError::Persistence(other.to_string()),
        }
    }
}

impl AppError {
    /// Stable machine-readable code, also used in audit trails
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) | AppError::InvalidInput(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::StateConflict(_) => "STATE_CONFLICT",
            AppError::DependencyUnavailable(_) => "DEPENDENCY_UNAVAILABLE",
            AppError::Persistence(_) => "PERSISTENCE_FAILURE",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            // booking transitions answer 400, not 409
            AppError::StateConflict(_) => StatusCode::BAD_REQUEST,
            AppError::DependencyUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Persistence(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Persistence failures abort the enclosing unit of work; everything else
    /// is scoped to a single item.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, AppError::Persistence(_))
    }
}

/// Error body returned by the API
#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    code: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code().to_string();

        let error_response = match self {
            AppError::Validation(msg) => {
                tracing::warn!("Validation error: {}", msg);
                ErrorResponse {
                    error: "Validation Error".to_string(),
                    message: msg,
                    details: None,
                    code,
                }
            }

            AppError::InvalidInput(e) => {
                tracing::warn!("Invalid input: {}", e);
                ErrorResponse {
                    error: "Validation Error".to_string(),
                    message: "The provided data is invalid".to_string(),
                    details: Some(json!(e)),
                    code,
                }
            }

            AppError::NotFound(msg) => {
                tracing::info!("Resource not found: {}", msg);
                ErrorResponse {
                    error: "Not Found".to_string(),
                    message: msg,
                    details: None,
                    code,
                }
            }

            AppError::StateConflict(msg) => {
                tracing::info!("State conflict: {}", msg);
                ErrorResponse {
                    error: "Invalid State Transition".to_string(),
                    message: msg,
                    details: None,
                    code,
                }
            }

            AppError::DependencyUnavailable(msg) => {
                tracing::error!("Dependency unavailable: {}", msg);
                ErrorResponse {
                    error: "Service Unavailable".to_string(),
                    message: msg,
                    details: None,
                    code,
                }
            }

            AppError::Persistence(msg) => {
                tracing::error!("Persistence failure: {}", msg);
                ErrorResponse {
                    error: "Persistence Failure".to_string(),
                    message: "An error occurred while accessing the store".to_string(),
                    details: Some(json!({ "store_error": msg })),
                    code,
                }
            }

            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ErrorResponse {
                    error: "Internal Server Error".to_string(),
                    message: "An unexpected error occurred".to_string(),
                    details: Some(json!({ "internal_error": msg })),
                    code,
                }
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Typed result for fallible operations
pub type AppResult<T> = Result<T, AppError>;

/// Helper for unknown-id errors
pub fn not_found_error(resource: &str, id: &str) -> AppError {
    AppError::NotFound(format!("{} with id '{}' not found", resource, id))
}

/// Helper for invalid state transitions
pub fn invalid_transition_error(resource: &str, id: &str, current: &str, operation: &str) -> AppError {
    AppError::StateConflict(format!(
        "Cannot {} {} '{}': it is already {}",
        operation, resource, id, current
    ))
}

/// Helper for malformed input
pub fn validation_error(message: impl Into<String>) -> AppError {
    AppError::Validation(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_conflict_maps_to_bad_request() {
        let err = invalid_transition_error("Booking", "BKG-1", "confirmed", "confirm");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "STATE_CONFLICT");
        assert!(err.to_string().contains("already confirmed"));
    }

    #[test]
    fn test_sqlx_errors_become_persistence_failures() {
        let err: AppError = sqlx::Error::PoolTimedOut.into();
        assert!(err.is_store_failure());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_not_found_helper() {
        let err = not_found_error("Booking", "BKG-404");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Not found: Booking with id 'BKG-404' not found");
    }
}
