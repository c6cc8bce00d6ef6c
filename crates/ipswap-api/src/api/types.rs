//! Request and response bodies of the HTTP API

use crate::error::ApiError;
use crate::services::ChangeResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /api/change-vm-ip` and `POST /api/diagnose-vm`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeIpRequest {
    pub current_ip: String,
}

impl ChangeIpRequest {
    /// Parse a raw body, producing the exact client-facing validation messages.
    ///
    /// Only presence and type are checked here; address syntax is checked by
    /// the locator.
    pub fn from_body(body: &[u8]) -> Result<Self, ApiError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|_| invalid("Invalid JSON in request body"))?;

        let current_ip = value
            .as_object()
            .and_then(|obj| obj.get("current_ip"))
            .ok_or_else(|| invalid("current_ip is required"))?;

        let current_ip = current_ip
            .as_str()
            .ok_or_else(|| invalid("current_ip must be a string"))?;

        Ok(Self {
            current_ip: current_ip.to_string(),
        })
    }
}

fn invalid(message: &str) -> ApiError {
    ApiError::InvalidRequest {
        message: message.to_string(),
    }
}

/// Successful rotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeIpResponse {
    pub success: bool,
    pub new_ip: String,
    pub vm_name: String,
    pub resource_group: String,
    pub message: String,
}

impl From<ChangeResult> for ChangeIpResponse {
    fn from(result: ChangeResult) -> Self {
        Self {
            success: true,
            message: result.message(),
            new_ip: result.new_ip,
            vm_name: result.vm_name,
            resource_group: result.resource_group,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}
