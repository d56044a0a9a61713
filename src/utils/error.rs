use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::utils::response::error as error_response;

/// Unified error contract for every workflow in the service. Handlers return
/// `Result<_, AppError>`; nothing throws across the workflow boundary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("Ticket creation failed: {0}")]
    TicketCreationFailed(String),

    #[error("Capacity update failed: {0}")]
    CapacityUpdateFailed(String),

    #[error("Upload rejected: {0}")]
    Upload(String),

    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::CapacityExceeded(_) => StatusCode::CONFLICT,
            AppError::Upload(_) => StatusCode::BAD_REQUEST,
            AppError::TicketCreationFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::CapacityUpdateFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthenticated(_) => "UNAUTHENTICATED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_FAILED",
            AppError::CapacityExceeded(_) => "CAPACITY_EXCEEDED",
            AppError::TicketCreationFailed(_) => "TICKET_CREATION_FAILED",
            AppError::CapacityUpdateFailed(_) => "CAPACITY_UPDATE_FAILED",
            AppError::Upload(_) => "UPLOAD_REJECTED",
            AppError::Database(_) => "DATA_STORE_UNAVAILABLE",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn log(&self) {
        match self {
            AppError::Unauthenticated(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::CapacityExceeded(msg)
            | AppError::Upload(msg) => {
                error!(error = ?self, message = %msg, "Request rejected");
            }
            AppError::TicketCreationFailed(msg)
            | AppError::CapacityUpdateFailed(msg)
            | AppError::Internal(msg) => {
                error!(error = ?self, message = %msg, "Application error");
            }
            AppError::Database(e) => {
                error!(error = ?e, "Database error");
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Only expose high-level messages to the client; backend failures
        // surface as a generic message with the detail kept in the logs.
        let public_message = match &self {
            AppError::Unauthenticated(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::CapacityExceeded(msg)
            | AppError::Upload(msg) => msg.clone(),
            AppError::TicketCreationFailed(_) | AppError::CapacityUpdateFailed(_) => {
                "Failed to create booking".to_string()
            }
            AppError::Database(_) => "A database error occurred".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
        };

        // Do not expose internal details in the API response
        let details = None;

        error_response(code, public_message, details, status)
    }
}
