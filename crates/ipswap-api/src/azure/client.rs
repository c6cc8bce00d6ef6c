//! HTTP client for Azure Resource Manager
//!
//! Covers the handful of network and compute calls the rotation needs:
//! listing and reading NICs and public IPs, reading VMs, creating and
//! deleting public IPs and writing NICs back. Mutating calls wait for the
//! long-running operation to finish before returning.

use super::builder::AzureClientBuilder;
use super::credentials::TokenCredential;
use super::error::{AzureError, Result};
use super::models::{
    ArmList, NetworkInterface, OperationStatus, PublicIpAddress, PublicIpRequest, VirtualMachine,
};
use super::resource_id::ResourceId;
use super::CloudProvider;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, LOCATION, RETRY_AFTER};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

pub(crate) const NETWORK_API_VERSION: &str = "2023-09-01";
pub(crate) const COMPUTE_API_VERSION: &str = "2023-09-01";

const ASYNC_OPERATION: &str = "azure-asyncoperation";

/// Client for the Azure Resource Manager REST API
pub struct AzureClient {
    pub(crate) http_client: reqwest::Client,
    pub(crate) credential: TokenCredential,
    pub(crate) base_url: String,
    pub(crate) subscription_id: String,
    pub(crate) operation_timeout: Duration,
    pub(crate) poll_interval: Duration,
}

impl AzureClient {
    /// Create a client using the builder pattern
    pub fn builder() -> AzureClientBuilder {
        AzureClientBuilder::default()
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    // ===== Private Helper Methods =====

    fn url(&self, path: &str, api_version: &str) -> String {
        format!("{}{}?api-version={}", self.base_url, path, api_version)
    }

    /// Attach the bearer token and send
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let token = self.credential.token().await?;
        let response = request.bearer_auth(token.expose()).send().await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            self.credential.invalidate().await;
        }

        Ok(response)
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.send(self.http_client.get(url)).await?;
        self.handle_response(response).await
    }

    /// Collect every page of a list endpoint by following `nextLink`
    async fn list_all<T: DeserializeOwned>(&self, path: &str, api_version: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(self.url(path, api_version));

        while let Some(url) = next {
            let page: ArmList<T> = self.get(&url).await?;
            items.extend(page.value);
            next = page.next_link.filter(|link| !link.is_empty());
        }

        Ok(items)
    }

    async fn put<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        api_version: &str,
        body: &B,
        operation: &str,
    ) -> Result<T> {
        let url = self.url(path, api_version);
        let response = self.send(self.http_client.put(&url).json(body)).await?;

        if !response.status().is_success() {
            return self.handle_error_response(response).await;
        }

        self.wait_for_completion(response.headers(), operation)
            .await?;
        self.get(&url).await
    }

    async fn delete(&self, path: &str, api_version: &str, operation: &str) -> Result<()> {
        let url = self.url(path, api_version);
        let response = self.send(self.http_client.delete(&url)).await?;

        match response.status() {
            StatusCode::NO_CONTENT => Ok(()),
            status if status.is_success() => {
                self.wait_for_completion(response.headers(), operation)
                    .await
            }
            _ => self.handle_error_response(response).await,
        }
    }

    /// Block until the long-running operation behind `headers` reaches a terminal state
    async fn wait_for_completion(&self, headers: &HeaderMap, operation: &str) -> Result<()> {
        let async_url = header_str(headers, ASYNC_OPERATION);
        let location_url = header_str(headers, LOCATION.as_str());

        if async_url.is_none() && location_url.is_none() {
            return Ok(());
        }

        let deadline = Instant::now() + self.operation_timeout;
        let mut delay = retry_after(headers).unwrap_or(self.poll_interval);

        loop {
            if Instant::now() + delay > deadline {
                warn!(operation, "Gave up waiting for Azure operation");
                return Err(AzureError::OperationTimeout {
                    operation: operation.to_string(),
                });
            }
            tokio::time::sleep(delay).await;

            let response = match (&async_url, &location_url) {
                (Some(url), _) | (None, Some(url)) => {
                    self.send(self.http_client.get(url.as_str())).await?
                }
                (None, None) => return Ok(()),
            };

            let next_delay = retry_after(response.headers()).unwrap_or(self.poll_interval);

            if async_url.is_some() {
                if !response.status().is_success() {
                    return self.handle_error_response(response).await;
                }
                let status: OperationStatus = response.json().await.map_err(|e| {
                    AzureError::InvalidResponse {
                        message: format!("Failed to parse status of {operation}: {e}"),
                    }
                })?;

                debug!(operation, status = %status.status, "Polled Azure operation");

                match status.status.as_str() {
                    "Succeeded" => return Ok(()),
                    "Failed" | "Canceled" | "Cancelled" => {
                        let message = status
                            .error
                            .map(|e| e.message)
                            .filter(|m| !m.is_empty())
                            .unwrap_or_else(|| "no details provided".to_string());
                        return Err(AzureError::OperationFailed {
                            operation: operation.to_string(),
                            status: status.status,
                            message,
                        });
                    }
                    _ => {}
                }
            } else {
                match response.status() {
                    StatusCode::ACCEPTED => {
                        debug!(operation, "Azure operation still in progress");
                    }
                    status if status.is_success() => return Ok(()),
                    _ => return self.handle_error_response(response).await,
                }
            }

            delay = next_delay;
        }
    }

    /// Handle successful response
    async fn handle_response<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        if response.status().is_success() {
            let text = response.text().await?;
            serde_json::from_str(&text).map_err(|e| AzureError::InvalidResponse {
                message: format!("Failed to parse response body: {e}"),
            })
        } else {
            self.handle_error_response(response).await
        }
    }

    /// Handle error response
    async fn handle_error_response<T>(&self, response: Response) -> Result<T> {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        Err(AzureError::from_response(status, &error_text))
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .filter(|value| !value.is_empty())
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[async_trait]
impl CloudProvider for AzureClient {
    async fn list_network_interfaces(&self) -> Result<Vec<NetworkInterface>> {
        let path = format!(
            "/subscriptions/{}/providers/Microsoft.Network/networkInterfaces",
            self.subscription_id
        );
        self.list_all(&path, NETWORK_API_VERSION).await
    }

    async fn get_network_interface(&self, id: &ResourceId) -> Result<NetworkInterface> {
        self.get(&self.url(id.as_str(), NETWORK_API_VERSION)).await
    }

    async fn update_network_interface(&self, nic: &NetworkInterface) -> Result<NetworkInterface> {
        let operation = format!("update network interface {}", nic.name);
        self.put(&nic.id, NETWORK_API_VERSION, nic, &operation).await
    }

    async fn list_public_ips(&self) -> Result<Vec<PublicIpAddress>> {
        let path = format!(
            "/subscriptions/{}/providers/Microsoft.Network/publicIPAddresses",
            self.subscription_id
        );
        self.list_all(&path, NETWORK_API_VERSION).await
    }

    async fn get_public_ip(&self, id: &ResourceId) -> Result<PublicIpAddress> {
        self.get(&self.url(id.as_str(), NETWORK_API_VERSION)).await
    }

    async fn create_public_ip(
        &self,
        resource_group: &str,
        name: &str,
        request: &PublicIpRequest,
    ) -> Result<PublicIpAddress> {
        let id = ResourceId::public_ip(&self.subscription_id, resource_group, name);
        let operation = format!("create public IP {name}");
        self.put(id.as_str(), NETWORK_API_VERSION, request, &operation)
            .await
    }

    async fn delete_public_ip(&self, id: &ResourceId) -> Result<()> {
        let operation = format!("delete public IP {}", id.name());
        self.delete(id.as_str(), NETWORK_API_VERSION, &operation)
            .await
    }

    async fn get_virtual_machine(&self, id: &ResourceId) -> Result<VirtualMachine> {
        self.get(&self.url(id.as_str(), COMPUTE_API_VERSION)).await
    }
}
