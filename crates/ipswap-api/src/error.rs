//! Error types for the ipswap API

use crate::azure::AzureError;
use crate::services::RotationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ipswap_common::ConfigurationError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the ipswap API
#[derive(Debug, Error)]
pub enum ApiError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigurationError),

    /// Malformed request; the message is returned as-is
    #[error("{message}")]
    InvalidRequest { message: String },

    /// Missing or wrong function key
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{message}")]
    NotFound { message: String },

    /// Azure rejected or failed an operation
    #[error("Azure service error: {0}")]
    Cloud(#[from] AzureError),

    /// Request timeout
    #[error("Request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// Internal server error
    #[error("Internal server error: {message}")]
    Internal { message: String },

    /// Other errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ApiError>;

impl From<RotationError> for ApiError {
    fn from(err: RotationError) -> Self {
        match err {
            RotationError::InvalidIp(_) => ApiError::InvalidRequest {
                message: err.to_string(),
            },
            RotationError::VmNotFound { .. } => ApiError::NotFound {
                message: err.to_string(),
            },
            RotationError::Cloud(e) => ApiError::Cloud(e),
            RotationError::Timeout { seconds } => ApiError::Timeout { seconds },
            other => ApiError::Internal {
                message: other.to_string(),
            },
        }
    }
}

impl ApiError {
    /// Get error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Config(_) => "IPSWAP_CONFIG_ERROR",
            ApiError::InvalidRequest { .. } => "IPSWAP_INVALID_REQUEST",
            ApiError::Unauthorized => "IPSWAP_UNAUTHORIZED",
            ApiError::NotFound { .. } => "IPSWAP_NOT_FOUND",
            ApiError::Cloud(_) => "IPSWAP_CLOUD_ERROR",
            ApiError::Timeout { .. } => "IPSWAP_TIMEOUT",
            ApiError::Internal { .. } => "IPSWAP_INTERNAL_ERROR",
            ApiError::Other(_) => "IPSWAP_OTHER_ERROR",
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Cloud(e) => e.is_retryable(),
            ApiError::Timeout { .. } => true,
            _ => false,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(
                code = self.error_code(),
                retryable = self.is_retryable(),
                "Request failed: {self}"
            );
        }

        let body = Json(ErrorResponse::new(self.to_string()));
        (status, body).into_response()
    }
}

/// Body of every failed API response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always false
    pub success: bool,

    /// Human-readable error message
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}
