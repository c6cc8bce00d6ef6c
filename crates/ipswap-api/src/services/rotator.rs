//! Public IP rotation
//!
//! A rotation runs strictly in order: locate the VM, create the new public IP
//! in the VM's resource group and region, point the NIC's IP configuration at
//! it, then delete the old public IP. The old IP is only released once the NIC
//! update has completed and the new address is known. A failed release is
//! logged and otherwise ignored.
//!
//! Only the read-only lookup is bounded by the request budget. Once the new IP
//! exists the rotation runs to the end; each ARM call is bounded by the
//! client's own operation timeout.

use super::locator::{VmLocator, VmMatch};
use super::RotationError;
use crate::azure::models::{PublicIpAddress, PublicIpRequest, SubResource, VirtualMachine};
use crate::azure::{CloudProvider, ResourceId};
use crate::config::RotationConfig;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Outcome of a successful rotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeResult {
    pub vm_name: String,
    pub resource_group: String,
    pub old_ip: String,
    pub new_ip: String,
    pub public_ip_name: String,
    /// False when the old public IP could not be deleted
    pub old_ip_released: bool,
}

impl ChangeResult {
    pub fn message(&self) -> String {
        format!(
            "IP successfully changed from {} to {}",
            self.old_ip, self.new_ip
        )
    }
}

pub struct IpRotator {
    provider: Arc<dyn CloudProvider>,
    locator: VmLocator,
    settings: RotationConfig,
    lookup_timeout: Option<Duration>,
}

impl IpRotator {
    pub fn new(
        provider: Arc<dyn CloudProvider>,
        locator: VmLocator,
        settings: RotationConfig,
    ) -> Self {
        Self {
            provider,
            locator,
            settings,
            lookup_timeout: None,
        }
    }

    /// Give up with a timeout if the VM cannot be resolved within `limit`
    pub fn with_lookup_timeout(mut self, limit: Duration) -> Self {
        self.lookup_timeout = Some(limit);
        self
    }

    /// Replace the public IP currently holding `current_ip`
    pub async fn rotate(&self, current_ip: &str) -> Result<ChangeResult, RotationError> {
        let (vm, machine) = self.lookup(current_ip).await?;

        let name = self.new_ip_name();
        let request = PublicIpRequest::static_address(
            &vm.address,
            machine.location,
            self.settings.ip_sku.clone(),
            self.settings.tags.clone(),
        );

        info!(
            vm = vm.vm_name(),
            public_ip = %name,
            "Creating replacement public IP"
        );
        let created = self
            .provider
            .create_public_ip(vm.resource_group(), &name, &request)
            .await?;
        let new_id = match created.id.parse::<ResourceId>() {
            Ok(id) => id,
            Err(_) => ResourceId::public_ip(vm.vm_id.subscription_id(), vm.resource_group(), &name),
        };

        if let Err(e) = self.attach(&vm, &new_id).await {
            error!(vm = vm.vm_name(), "Failed to attach new public IP: {e}");
            self.release_unattached(&new_id).await;
            return Err(e);
        }

        let new_ip = match self.resolve_address(&created, &new_id, &name).await {
            Ok(address) => address,
            Err(e) => {
                error!(vm = vm.vm_name(), "Could not read the new address: {e}");
                self.restore(&vm, &new_id).await;
                return Err(e);
            }
        };

        let old_ip_released = match self.provider.delete_public_ip(&vm.public_ip_id).await {
            Ok(()) => {
                info!(public_ip = %vm.public_ip_id, "Deleted old public IP");
                true
            }
            Err(e) => {
                warn!(
                    public_ip = %vm.public_ip_id,
                    "New IP is attached but the old public IP could not be deleted: {e}"
                );
                false
            }
        };

        info!(
            vm = vm.vm_name(),
            resource_group = vm.resource_group(),
            "IP changed from {} to {new_ip}",
            vm.address
        );

        Ok(ChangeResult {
            vm_name: vm.vm_name().to_string(),
            resource_group: vm.resource_group().to_string(),
            old_ip: vm.address.to_string(),
            new_ip,
            public_ip_name: name,
            old_ip_released,
        })
    }

    /// Resolve the VM and its region; nothing is modified here
    async fn lookup(&self, current_ip: &str) -> Result<(VmMatch, VirtualMachine), RotationError> {
        let lookup = async {
            let vm = self.locator.find_vm_by_ip(current_ip).await?;
            let machine = self.provider.get_virtual_machine(&vm.vm_id).await?;
            Ok::<_, RotationError>((vm, machine))
        };

        match self.lookup_timeout {
            Some(limit) => tokio::time::timeout(limit, lookup)
                .await
                .map_err(|_| RotationError::Timeout {
                    seconds: limit.as_secs(),
                })?,
            None => lookup.await,
        }
    }

    /// Point the matched IP configuration at `new_id`, keeping the rest of the NIC as read
    async fn attach(&self, vm: &VmMatch, new_id: &ResourceId) -> Result<(), RotationError> {
        let mut nic = self.provider.get_network_interface(&vm.nic_id).await?;

        let ip_config = nic
            .ip_configuration_mut(&vm.ip_configuration)
            .ok_or_else(|| RotationError::IpConfigurationMissing {
                nic: vm.nic_id.name().to_string(),
                ip_configuration: vm.ip_configuration.clone(),
            })?;
        ip_config.properties.public_ip_address = Some(SubResource::new(new_id.as_str()));

        self.provider.update_network_interface(&nic).await?;
        Ok(())
    }

    async fn resolve_address(
        &self,
        created: &PublicIpAddress,
        new_id: &ResourceId,
        name: &str,
    ) -> Result<String, RotationError> {
        if let Some(address) = created.address() {
            return Ok(address.to_string());
        }

        self.provider
            .get_public_ip(new_id)
            .await?
            .address()
            .map(str::to_string)
            .ok_or_else(|| RotationError::NoAddressAllocated {
                name: name.to_string(),
            })
    }

    /// Put the old public IP back on the NIC and drop the new one
    async fn restore(&self, vm: &VmMatch, new_id: &ResourceId) {
        match self.attach(vm, &vm.public_ip_id).await {
            Ok(()) => {
                info!(vm = vm.vm_name(), "Restored old public IP");
                self.release_unattached(new_id).await;
            }
            Err(e) => error!(
                vm = vm.vm_name(),
                public_ip = %new_id,
                "Could not restore old public IP, the VM keeps the new one: {e}"
            ),
        }
    }

    async fn release_unattached(&self, id: &ResourceId) {
        match self.provider.delete_public_ip(id).await {
            Ok(()) => info!(public_ip = %id, "Deleted unattached replacement public IP"),
            Err(e) => warn!(public_ip = %id, "Could not delete unattached public IP: {e}"),
        }
    }

    fn new_ip_name(&self) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}{}", self.settings.ip_name_prefix, &suffix[..8])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::azure::models::{NetworkInterface, PublicIpAddress};
    use crate::azure::{AzureError, MockCloudProvider};
    use crate::config::AccessConfig;
    use crate::services::fixtures::{self, nic, public_ip, virtual_machine};
    use mockall::Sequence;
    use std::sync::Mutex;

    fn rotator(mock: MockCloudProvider) -> IpRotator {
        let provider: Arc<dyn CloudProvider> = Arc::new(mock);
        let locator = VmLocator::new(provider.clone(), AccessConfig::default());
        IpRotator::new(provider, locator, RotationConfig::default())
    }

    fn created_ip(name: &str, address: Option<&str>) -> PublicIpAddress {
        public_ip("my-rg", name, address)
    }

    /// Locator lookups for `my-vm` holding `old-ip` = 20.123.45.67
    fn expect_lookup(mock: &mut MockCloudProvider) {
        mock.expect_list_network_interfaces()
            .returning(|| Ok(vec![nic("my-rg", "nic-1", Some("my-vm"), Some("old-ip"))]));
        mock.expect_get_virtual_machine()
            .returning(|_| Ok(virtual_machine("my-rg", "my-vm")));
    }

    #[tokio::test]
    async fn test_rotation_swaps_then_releases_old_ip() {
        let mut mock = MockCloudProvider::new();
        let mut seq = Sequence::new();
        expect_lookup(&mut mock);

        mock.expect_get_public_ip()
            .withf(|id| id.name() == "old-ip")
            .returning(|_| Ok(public_ip("my-rg", "old-ip", Some("20.123.45.67"))));

        mock.expect_create_public_ip()
            .withf(|rg, name, request| {
                rg == "my-rg"
                    && name.starts_with("ip-")
                    && name.len() == 11
                    && request.location == "westeurope"
                    && request.sku.name == "Standard"
                    && request.properties.allocation_method == "Static"
                    && request.tags["CreatedBy"] == "IPChangeAPI"
                    && request.tags["Purpose"] == "VM-IP-Replacement"
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, name, _| Ok(created_ip(name, Some("20.234.56.78"))));

        mock.expect_get_network_interface()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(nic("my-rg", "nic-1", Some("my-vm"), Some("old-ip"))));

        let written = Arc::new(Mutex::new(None));
        let captured = written.clone();
        mock.expect_update_network_interface()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |nic| {
                *captured.lock().unwrap() = Some(nic.clone());
                Ok(nic.clone())
            });

        mock.expect_delete_public_ip()
            .withf(|id| id.name() == "old-ip")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let result = rotator(mock).rotate("20.123.45.67").await.unwrap();

        assert_eq!(result.vm_name, "my-vm");
        assert_eq!(result.resource_group, "my-rg");
        assert_eq!(result.new_ip, "20.234.56.78");
        assert_ne!(result.new_ip, result.old_ip);
        assert!(result.old_ip_released);
        assert_eq!(
            result.message(),
            "IP successfully changed from 20.123.45.67 to 20.234.56.78"
        );

        let nic = written.lock().unwrap().take().unwrap();
        let ip_config = nic.ip_configuration("ipconfig1").unwrap();
        let attached = ip_config.properties.public_ip_address.as_ref().unwrap();
        assert_eq!(
            attached.id,
            fixtures::public_ip_id("my-rg", &result.public_ip_name)
        );
        assert!(ip_config.properties.extra.contains_key("subnet"));
    }

    #[tokio::test]
    async fn test_unknown_ip_creates_nothing() {
        let mut mock = MockCloudProvider::new();
        mock.expect_list_network_interfaces().returning(|| Ok(vec![]));
        mock.expect_create_public_ip().times(0);
        mock.expect_delete_public_ip().times(0);

        let err = rotator(mock).rotate("1.2.3.4").await.unwrap_err();
        assert!(matches!(err, RotationError::VmNotFound { .. }));
    }

    #[tokio::test]
    async fn test_attach_failure_keeps_old_ip_and_removes_new_one() {
        let mut mock = MockCloudProvider::new();
        expect_lookup(&mut mock);
        mock.expect_get_public_ip()
            .returning(|_| Ok(public_ip("my-rg", "old-ip", Some("20.123.45.67"))));
        mock.expect_create_public_ip()
            .returning(|_, name, _| Ok(created_ip(name, Some("20.234.56.78"))));
        mock.expect_get_network_interface()
            .returning(|_| Ok(nic("my-rg", "nic-1", Some("my-vm"), Some("old-ip"))));
        mock.expect_update_network_interface().returning(|_| {
            Err(AzureError::Conflict {
                message: "another operation is in progress".to_string(),
            })
        });
        mock.expect_delete_public_ip()
            .withf(|id| id.name() == "old-ip")
            .times(0);
        mock.expect_delete_public_ip()
            .withf(|id| id.name().starts_with("ip-"))
            .times(1)
            .returning(|_| Ok(()));

        let err = rotator(mock).rotate("20.123.45.67").await.unwrap_err();
        assert!(matches!(
            err,
            RotationError::Cloud(AzureError::Conflict { .. })
        ));
    }

    #[tokio::test]
    async fn test_old_ip_delete_failure_still_succeeds() {
        let mut mock = MockCloudProvider::new();
        expect_lookup(&mut mock);
        mock.expect_get_public_ip()
            .returning(|_| Ok(public_ip("my-rg", "old-ip", Some("20.123.45.67"))));
        mock.expect_create_public_ip()
            .returning(|_, name, _| Ok(created_ip(name, Some("20.234.56.78"))));
        mock.expect_get_network_interface()
            .returning(|_| Ok(nic("my-rg", "nic-1", Some("my-vm"), Some("old-ip"))));
        mock.expect_update_network_interface()
            .returning(|nic| Ok(nic.clone()));
        mock.expect_delete_public_ip().returning(|_| {
            Err(AzureError::Throttled {
                message: "slow down".to_string(),
            })
        });

        let result = rotator(mock).rotate("20.123.45.67").await.unwrap();
        assert_eq!(result.new_ip, "20.234.56.78");
        assert!(!result.old_ip_released);
    }

    #[tokio::test]
    async fn test_missing_address_is_read_again_after_attach() {
        let mut mock = MockCloudProvider::new();
        expect_lookup(&mut mock);
        mock.expect_get_public_ip()
            .withf(|id| id.name() == "old-ip")
            .returning(|_| Ok(public_ip("my-rg", "old-ip", Some("20.123.45.67"))));
        mock.expect_get_public_ip()
            .withf(|id| id.name().starts_with("ip-"))
            .times(1)
            .returning(|id| Ok(created_ip(id.name(), Some("20.234.56.78"))));
        mock.expect_create_public_ip()
            .returning(|_, name, _| Ok(created_ip(name, None)));
        mock.expect_get_network_interface()
            .returning(|_| Ok(nic("my-rg", "nic-1", Some("my-vm"), Some("old-ip"))));
        mock.expect_update_network_interface()
            .returning(|nic| Ok(nic.clone()));
        mock.expect_delete_public_ip().returning(|_| Ok(()));

        let result = rotator(mock).rotate("20.123.45.67").await.unwrap();
        assert_eq!(result.new_ip, "20.234.56.78");
    }

    #[tokio::test]
    async fn test_ipv6_rotation_requests_ipv6_address() {
        let mut mock = MockCloudProvider::new();
        expect_lookup(&mut mock);
        mock.expect_get_public_ip()
            .returning(|_| Ok(public_ip("my-rg", "old-ip", Some("2001:db8::1"))));
        mock.expect_create_public_ip()
            .withf(|_, _, request| request.properties.address_version == "IPv6")
            .times(1)
            .returning(|_, name, _| Ok(created_ip(name, Some("2001:db8::2"))));
        mock.expect_get_network_interface()
            .returning(|_| Ok(nic("my-rg", "nic-1", Some("my-vm"), Some("old-ip"))));
        mock.expect_update_network_interface()
            .returning(|nic| Ok(nic.clone()));
        mock.expect_delete_public_ip().returning(|_| Ok(()));

        let result = rotator(mock).rotate("2001:db8::1").await.unwrap();
        assert_eq!(result.old_ip, "2001:db8::1");
        assert_eq!(result.new_ip, "2001:db8::2");
    }

    #[tokio::test]
    async fn test_unreadable_new_address_restores_old_ip() {
        let mut mock = MockCloudProvider::new();
        expect_lookup(&mut mock);
        mock.expect_get_public_ip()
            .withf(|id| id.name() == "old-ip")
            .returning(|_| Ok(public_ip("my-rg", "old-ip", Some("20.123.45.67"))));
        mock.expect_get_public_ip()
            .withf(|id| id.name().starts_with("ip-"))
            .returning(|_| {
                Err(AzureError::Throttled {
                    message: "slow down".to_string(),
                })
            });
        mock.expect_create_public_ip()
            .returning(|_, name, _| Ok(created_ip(name, None)));
        mock.expect_get_network_interface()
            .returning(|_| Ok(nic("my-rg", "nic-1", Some("my-vm"), Some("old-ip"))));

        let written = Arc::new(Mutex::new(Vec::new()));
        let captured = written.clone();
        mock.expect_update_network_interface()
            .times(2)
            .returning(move |nic| {
                captured.lock().unwrap().push(nic.clone());
                Ok(nic.clone())
            });
        mock.expect_delete_public_ip()
            .withf(|id| id.name() == "old-ip")
            .times(0);
        mock.expect_delete_public_ip()
            .withf(|id| id.name().starts_with("ip-"))
            .times(1)
            .returning(|_| Ok(()));

        let err = rotator(mock).rotate("20.123.45.67").await.unwrap_err();
        assert!(matches!(
            err,
            RotationError::Cloud(AzureError::Throttled { .. })
        ));

        let updates = written.lock().unwrap();
        let attached = |nic: &NetworkInterface| {
            nic.ip_configuration("ipconfig1")
                .and_then(|config| config.properties.public_ip_address.clone())
                .unwrap()
                .id
        };
        assert!(attached(&updates[0]).contains("/publicIPAddresses/ip-"));
        assert_eq!(attached(&updates[1]), fixtures::public_ip_id("my-rg", "old-ip"));
    }

    #[tokio::test]
    async fn test_missing_vm_creates_nothing() {
        let mut mock = MockCloudProvider::new();
        mock.expect_list_network_interfaces()
            .returning(|| Ok(vec![nic("my-rg", "nic-1", Some("my-vm"), Some("old-ip"))]));
        mock.expect_get_public_ip()
            .returning(|_| Ok(public_ip("my-rg", "old-ip", Some("20.123.45.67"))));
        mock.expect_get_virtual_machine().returning(|_| {
            Err(AzureError::NotFound {
                message: "my-vm not found".to_string(),
            })
        });
        mock.expect_create_public_ip().times(0);
        mock.expect_update_network_interface().times(0);
        mock.expect_delete_public_ip().times(0);

        let err = rotator(mock).rotate("20.123.45.67").await.unwrap_err();
        assert!(matches!(
            err,
            RotationError::Cloud(AzureError::NotFound { .. })
        ));
    }

    #[test]
    fn test_new_ip_name_shape() {
        let rotator = rotator(MockCloudProvider::new());
        let name = rotator.new_ip_name();
        assert!(name.starts_with("ip-"));
        assert_eq!(name.len(), 11);
        assert!(name[3..].chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(name, rotator.new_ip_name());
    }
}
