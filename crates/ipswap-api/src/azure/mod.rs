//! Azure Resource Manager adapter
//!
//! [`CloudProvider`] is the seam between the rotation logic and Azure;
//! [`AzureClient`] implements it over the ARM REST API.

mod builder;
mod client;
mod credentials;
pub mod error;
pub mod models;
pub mod resource_id;

pub use builder::AzureClientBuilder;
pub use client::AzureClient;
pub use credentials::TokenCredential;
pub use error::{AzureError, Result};
pub use resource_id::{ResourceId, ResourceIdError};

use async_trait::async_trait;
use models::{NetworkInterface, PublicIpAddress, PublicIpRequest, VirtualMachine};

/// Cloud operations needed to find and rotate a VM's public IP
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Every network interface in the subscription
    async fn list_network_interfaces(&self) -> Result<Vec<NetworkInterface>>;

    async fn get_network_interface(&self, id: &ResourceId) -> Result<NetworkInterface>;

    /// Write a network interface back; waits for the update to finish
    async fn update_network_interface(&self, nic: &NetworkInterface) -> Result<NetworkInterface>;

    /// Every public IP address in the subscription
    async fn list_public_ips(&self) -> Result<Vec<PublicIpAddress>>;

    async fn get_public_ip(&self, id: &ResourceId) -> Result<PublicIpAddress>;

    /// Create a public IP and return it once an address is allocated
    async fn create_public_ip(
        &self,
        resource_group: &str,
        name: &str,
        request: &PublicIpRequest,
    ) -> Result<PublicIpAddress>;

    /// Delete a public IP; waits for the deletion to finish
    async fn delete_public_ip(&self, id: &ResourceId) -> Result<()>;

    async fn get_virtual_machine(&self, id: &ResourceId) -> Result<VirtualMachine>;
}
