//! Reverse lookup from a public IP address to the VM that owns it

use super::{parse_ip, RotationError};
use crate::azure::{AzureError, CloudProvider, ResourceId};
use crate::config::AccessConfig;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where a public IP is attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmMatch {
    pub vm_id: ResourceId,
    pub nic_id: ResourceId,
    /// Name of the IP configuration on the NIC that holds the public IP
    pub ip_configuration: String,
    pub public_ip_id: ResourceId,
    pub address: IpAddr,
}

impl VmMatch {
    pub fn vm_name(&self) -> &str {
        self.vm_id.name()
    }

    pub fn resource_group(&self) -> &str {
        self.vm_id.resource_group()
    }
}

/// Scans the subscription's NICs for the one carrying a given public IP
#[derive(Clone)]
pub struct VmLocator {
    provider: Arc<dyn CloudProvider>,
    access: AccessConfig,
}

impl VmLocator {
    pub fn new(provider: Arc<dyn CloudProvider>, access: AccessConfig) -> Self {
        Self { provider, access }
    }

    /// Find the VM whose NIC holds `current_ip`.
    ///
    /// NICs without a VM are skipped, and so are public IPs that cannot be
    /// read. The first match in listing order wins. A match outside the
    /// allowed resource groups is reported as not found.
    pub async fn find_vm_by_ip(&self, current_ip: &str) -> Result<VmMatch, RotationError> {
        let target = parse_ip(current_ip)?;
        let nics = self.provider.list_network_interfaces().await?;

        debug!(count = nics.len(), target = %target, "Scanning network interfaces");

        for nic in &nics {
            let Some(vm_ref) = &nic.properties.virtual_machine else {
                continue;
            };

            for ip_config in &nic.properties.ip_configurations {
                let Some(public_ip_ref) = &ip_config.properties.public_ip_address else {
                    continue;
                };

                let public_ip_id: ResourceId = match public_ip_ref.id.parse() {
                    Ok(id) => id,
                    Err(e) => {
                        warn!(nic = %nic.name, "Skipping malformed public IP reference: {e}");
                        continue;
                    }
                };

                let public_ip = match self.provider.get_public_ip(&public_ip_id).await {
                    Ok(ip) => ip,
                    Err(e) => {
                        warn!(public_ip = %public_ip_id, "Could not fetch public IP details: {e}");
                        continue;
                    }
                };

                if !public_ip.has_address(&target) {
                    continue;
                }

                let nic_id = parse_arm_id(&nic.id)?;
                let vm_id = parse_arm_id(&vm_ref.id)?;

                if !self.access.is_allowed(nic_id.resource_group()) {
                    warn!(
                        resource_group = nic_id.resource_group(),
                        vm = vm_id.name(),
                        "VM holding {target} is outside the allowed resource groups"
                    );
                    return Err(RotationError::VmNotFound {
                        ip: current_ip.to_string(),
                    });
                }

                info!(
                    vm = vm_id.name(),
                    resource_group = vm_id.resource_group(),
                    nic = %nic.name,
                    ip_configuration = %ip_config.name,
                    "Found VM for {target}"
                );

                return Ok(VmMatch {
                    vm_id,
                    nic_id,
                    ip_configuration: ip_config.name.clone(),
                    public_ip_id,
                    address: target,
                });
            }
        }

        info!("No VM found with public IP {target}");
        Err(RotationError::VmNotFound {
            ip: current_ip.to_string(),
        })
    }
}

fn parse_arm_id(raw: &str) -> Result<ResourceId, AzureError> {
    raw.parse().map_err(|e| AzureError::InvalidResponse {
        message: format!("{e}"),
    })
}
