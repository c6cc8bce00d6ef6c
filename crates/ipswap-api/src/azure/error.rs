//! Errors raised by the Azure Resource Manager adapter

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AzureError {
    /// Token acquisition failed or the token was rejected
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The principal lacks permission for the operation
    #[error("Authorization failed: {message}")]
    Authorization { message: String },

    #[error("Resource not found: {message}")]
    NotFound { message: String },

    /// Another operation holds the resource (e.g. a concurrent NIC update)
    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Request throttled by Azure: {message}")]
    Throttled { message: String },

    #[error("Azure API error ({status}) {code}: {message}")]
    Api {
        status: StatusCode,
        code: String,
        message: String,
    },

    /// A long-running operation finished in a non-success state
    #[error("Operation {operation} ended with status {status}: {message}")]
    OperationFailed {
        operation: String,
        status: String,
        message: String,
    },

    #[error("Operation {operation} did not complete in time")]
    OperationTimeout { operation: String },

    #[error("Unexpected response from Azure: {message}")]
    InvalidResponse { message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl AzureError {
    /// Whether the caller could reasonably retry the request later
    pub fn is_retryable(&self) -> bool {
        match self {
            AzureError::Throttled { .. }
            | AzureError::Conflict { .. }
            | AzureError::OperationTimeout { .. } => true,
            AzureError::Api { status, .. } => status.is_server_error(),
            AzureError::HttpClient(err) => err.is_timeout() || err.is_connect(),
            _ => false,
        }
    }

    /// Map an ARM error response onto the taxonomy
    pub(crate) fn from_response(status: StatusCode, body: &str) -> Self {
        let (code, message) = match serde_json::from_str::<ArmErrorResponse>(body) {
            Ok(parsed) => (parsed.error.code, parsed.error.message),
            Err(_) if body.trim().is_empty() => (
                String::new(),
                status.canonical_reason().unwrap_or("unknown").to_string(),
            ),
            Err(_) => (String::new(), body.trim().to_string()),
        };

        match status {
            StatusCode::UNAUTHORIZED => AzureError::Authentication { message },
            StatusCode::FORBIDDEN => AzureError::Authorization { message },
            StatusCode::NOT_FOUND => AzureError::NotFound { message },
            StatusCode::CONFLICT => AzureError::Conflict { message },
            StatusCode::TOO_MANY_REQUESTS => AzureError::Throttled { message },
            _ => AzureError::Api {
                status,
                code,
                message,
            },
        }
    }
}

/// Error envelope returned by ARM
#[derive(Debug, Clone, Deserialize)]
pub struct ArmErrorResponse {
    pub error: ArmErrorDetail,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArmErrorDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

pub type Result<T> = std::result::Result<T, AzureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_response_parses_arm_envelope() {
        let body = r#"{"error":{"code":"AuthorizationFailed","message":"no access"}}"#;
        match AzureError::from_response(StatusCode::FORBIDDEN, body) {
            AzureError::Authorization { message } => assert_eq!(message, "no access"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_from_response_keeps_code_for_generic_errors() {
        let body = r#"{"error":{"code":"InternalError","message":"boom"}}"#;
        match AzureError::from_response(StatusCode::BAD_GATEWAY, body) {
            AzureError::Api {
                status,
                code,
                message,
            } => {
                assert_eq!(status, StatusCode::BAD_GATEWAY);
                assert_eq!(code, "InternalError");
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_from_response_with_plain_body() {
        match AzureError::from_response(StatusCode::TOO_MANY_REQUESTS, "slow down") {
            AzureError::Throttled { message } => assert_eq!(message, "slow down"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_retryable_errors() {
        assert!(AzureError::Throttled {
            message: "x".into()
        }
        .is_retryable());
        assert!(AzureError::Api {
            status: StatusCode::SERVICE_UNAVAILABLE,
            code: String::new(),
            message: "x".into()
        }
        .is_retryable());
        assert!(!AzureError::NotFound {
            message: "x".into()
        }
        .is_retryable());
    }
}
