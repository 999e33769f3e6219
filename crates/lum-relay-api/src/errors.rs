//! Error types for the HTTP service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use lum_relay_core::ServiceError;
use tracing::{error, warn};

/// Message returned for every 5xx response
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";

/// Handler errors with HTTP status code mapping
///
/// - `400 Bad Request`: malformed bodies, missing fields, missing payload parameters
/// - `401 Unauthorized`: missing or invalid bearer token
/// - `404 Not Found`: unknown webhook, or one owned by another user
/// - `500 Internal Server Error`: everything else; the detail is logged and
///   the client sees a generic message
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{message}")]
    BadRequest { message: String },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{message}")]
    NotFound { message: String },

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// HTTP status this error maps to
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Service(e) => match e {
                ServiceError::NotFound { .. } | ServiceError::NotFoundOrInactive { .. } => {
                    StatusCode::NOT_FOUND
                }
                ServiceError::MissingParameters { .. }
                | ServiceError::InvalidRequest { .. }
                | ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
                ServiceError::Downstream(_) | ServiceError::Store(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = if status.is_server_error() {
            // Log detailed error server-side but return generic message to client
            match &self {
                Self::Service(e) => error!(
                    error = %e,
                    transient = e.is_transient(),
                    "Request failed with internal error"
                ),
                other => error!(error = %other, "Request failed with internal error"),
            }
            INTERNAL_ERROR_MESSAGE.to_string()
        } else {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
            self.to_string()
        };

        let body = serde_json::json!({
            "success": false,
            "error": message,
            "status": status.as_u16(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        (status, Json(body)).into_response()
    }
}

/// Server startup and runtime errors
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Store initialization failed: {message}")]
    StoreFailed { message: String },
}

impl StartupError {
    /// Process exit code for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::BindFailed { .. } => 1,
            Self::ServerFailed { .. } => 2,
            Self::Configuration(_) => 3,
            Self::StoreFailed { .. } => 4,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Configuration loading failed: {message}")]
    Load { message: String },
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;
