//! Azure credentials and Resource Manager client configuration

use ipswap_common::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A string that never shows up in `Debug` output or logs
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("\"\"")
        } else {
            f.write_str("\"***\"")
        }
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Azure settings, normally filled from the `AZURE_*` environment variables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureConfig {
    /// `AZURE_SUBSCRIPTION_ID`
    pub subscription_id: String,

    /// `AZURE_TENANT_ID`
    pub tenant_id: String,

    /// `AZURE_CLIENT_ID`
    pub client_id: String,

    /// `AZURE_CLIENT_SECRET`
    pub client_secret: SecretString,

    /// Entra ID authority used for token requests
    pub authority_host: String,

    /// Azure Resource Manager base URL
    pub resource_manager_endpoint: String,

    /// Per-request HTTP timeout in seconds
    pub http_timeout: u64,

    /// Connection timeout in seconds
    pub connect_timeout: u64,

    /// Upper bound for waiting on a long-running operation, in seconds
    pub operation_timeout: u64,

    /// Delay between long-running operation polls when Azure gives no hint, in seconds
    pub poll_interval: u64,
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            subscription_id: String::new(),
            tenant_id: String::new(),
            client_id: String::new(),
            client_secret: SecretString::default(),
            authority_host: "https://login.microsoftonline.com".to_string(),
            resource_manager_endpoint: "https://management.azure.com".to_string(),
            http_timeout: 30,
            connect_timeout: 10,
            operation_timeout: 240,
            poll_interval: 2,
        }
    }
}

impl AzureConfig {
    /// Extract the service principal credentials, failing on any missing value
    pub fn credentials(&self) -> Result<AzureCredentials, ConfigurationError> {
        let required = |key: &str, value: &str| {
            if value.trim().is_empty() {
                Err(ConfigurationError::MissingValue {
                    key: key.to_string(),
                })
            } else {
                Ok(value.trim().to_string())
            }
        };

        Ok(AzureCredentials {
            subscription_id: required("AZURE_SUBSCRIPTION_ID", &self.subscription_id)?,
            tenant_id: required("AZURE_TENANT_ID", &self.tenant_id)?,
            client_id: required("AZURE_CLIENT_ID", &self.client_id)?,
            client_secret: SecretString::new(required(
                "AZURE_CLIENT_SECRET",
                self.client_secret.expose(),
            )?),
        })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }
}

/// Service principal credentials, immutable once loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureCredentials {
    pub subscription_id: String,
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: SecretString,
}
