//! Builder pattern for constructing AzureClient

use super::client::AzureClient;
use super::credentials::TokenCredential;
use super::error::{AzureError, Result};
use crate::config::{AzureConfig, AzureCredentials};
use std::time::Duration;

/// Builder for constructing an AzureClient with custom configuration
#[derive(Default)]
pub struct AzureClientBuilder {
    credentials: Option<AzureCredentials>,
    authority_host: Option<String>,
    resource_manager_endpoint: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    operation_timeout: Option<Duration>,
    poll_interval: Option<Duration>,
}

impl AzureClientBuilder {
    /// Seed every setting from the loaded configuration
    pub fn from_config(config: &AzureConfig, credentials: AzureCredentials) -> Self {
        Self::default()
            .credentials(credentials)
            .authority_host(&config.authority_host)
            .resource_manager_endpoint(&config.resource_manager_endpoint)
            .timeout(config.http_timeout())
            .connect_timeout(config.connect_timeout())
            .operation_timeout(config.operation_timeout())
            .poll_interval(config.poll_interval())
    }

    /// Set the service principal used for token requests
    pub fn credentials(mut self, credentials: AzureCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn authority_host(mut self, url: impl Into<String>) -> Self {
        self.authority_host = Some(url.into());
        self
    }

    /// Set the Resource Manager base URL
    pub fn resource_manager_endpoint(mut self, url: impl Into<String>) -> Self {
        self.resource_manager_endpoint = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set how long to wait for a long-running operation
    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<AzureClient> {
        let credentials = self.credentials.ok_or_else(|| AzureError::Authentication {
            message: "credentials are required".into(),
        })?;

        let defaults = AzureConfig::default();
        let authority_host = self.authority_host.unwrap_or(defaults.authority_host);
        let base_url = self
            .resource_manager_endpoint
            .unwrap_or(defaults.resource_manager_endpoint)
            .trim_end_matches('/')
            .to_string();

        let mut client_builder = reqwest::Client::builder()
            .timeout(self.timeout.unwrap_or(Duration::from_secs(30)));

        if let Some(timeout) = self.connect_timeout {
            client_builder = client_builder.connect_timeout(timeout);
        }

        let http_client = client_builder.build()?;
        let credential =
            TokenCredential::new(http_client.clone(), &authority_host, &base_url, &credentials);

        Ok(AzureClient {
            http_client,
            credential,
            base_url,
            subscription_id: credentials.subscription_id,
            operation_timeout: self.operation_timeout.unwrap_or(Duration::from_secs(240)),
            poll_interval: self.poll_interval.unwrap_or(Duration::from_secs(2)),
        })
    }
}
