//! Application error types.
//!
//! Every fallible operation in the workspace returns [`AppResult`]. Failed SQL
//! statements are deliberately absent: they travel as
//! [`QueryOutcome::Failed`](crate::models::query::QueryOutcome) so the
//! pipeline can hand them to the language model.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::response::ApiResponse;

/// Result alias used across the workspace.
pub type AppResult<T> = Result<T, AppError>;

/// Unified application error.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// No database session exists yet.
    #[error("Please connect to the database first.")]
    NotConnected,

    /// The database could not be reached or rejected the credentials.
    #[error("database connection failed: {0}")]
    DatabaseConnection(String),

    /// The requested engine is not one of the supported kinds.
    #[error("unsupported database type: {0}")]
    UnsupportedDatabaseType(String),

    /// Schema introspection failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(String),

    /// The language model, translation or speech service failed.
    #[error("external service error: {0}")]
    ExternalService(String),

    /// Invalid input.
    #[error("validation error: {0}")]
    Validation(String),

    /// A requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Artifact file I/O failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Machine-readable error code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotConnected => "NOT_CONNECTED",
            AppError::DatabaseConnection(_) => "DATABASE_CONNECTION_ERROR",
            AppError::UnsupportedDatabaseType(_) => "UNSUPPORTED_DATABASE_TYPE",
            AppError::DatabaseQuery(_) => "DATABASE_QUERY_ERROR",
            AppError::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Io(_) => "IO_ERROR",
        }
    }

    /// HTTP status the error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotConnected => StatusCode::CONFLICT,
            AppError::DatabaseConnection(_) | AppError::ExternalService(_) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::UnsupportedDatabaseType(_) | AppError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DatabaseQuery(_) | AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "Request failed");
        } else {
            tracing::debug!(code = self.code(), error = %self, "Request rejected");
        }
        let body = ApiResponse::err(self.code(), self.to_string());
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_connected_message_is_user_facing() {
        let err = AppError::NotConnected;
        assert_eq!(err.to_string(), "Please connect to the database first.");
        assert_eq!(err.code(), "NOT_CONNECTED");
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::ExternalService("x".into()).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::UnsupportedDatabaseType("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        let io = AppError::from(std::io::Error::other("disk full"));
        assert_eq!(io.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(io.code(), "IO_ERROR");
    }

    #[tokio::test]
    async fn test_into_response_uses_envelope() {
        let response = AppError::NotFound("response.mp3".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "NOT_FOUND");
        assert_eq!(json["error"]["message"], "not found: response.mp3");
    }
}
