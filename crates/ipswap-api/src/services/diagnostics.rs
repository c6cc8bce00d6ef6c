//! Read-only report of what the locator sees for a given IP

use crate::azure::models::PublicIpAddress;
use crate::azure::{AzureError, CloudProvider, ResourceId};
use crate::config::AccessConfig;
use serde::Serialize;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{error, info, warn};

/// A NIC IP configuration that references a public IP
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NicPublicIp {
    pub nic_name: String,
    pub resource_group: String,
    /// Allocated address, absent when it could not be read
    pub public_ip: Option<String>,
    pub public_ip_resource_id: String,
    pub vm_attached: bool,
    pub vm_id: Option<String>,
}

/// Entry of the fallback scan over public IP resources
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicIpSummary {
    pub name: String,
    pub resource_group: String,
    pub ip_address: String,
    pub associated_resource: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticReport {
    pub target_ip: String,
    pub subscription_id: String,
    /// Empty when every resource group is allowed
    pub allowed_resource_groups: Vec<String>,
    pub total_nics_scanned: Option<usize>,
    pub vms_with_public_ips: Vec<NicPublicIp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_match: Option<NicPublicIp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternative_scan: Option<Vec<PublicIpSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_match_alternative: Option<PublicIpSummary>,
    pub errors: Vec<String>,
}

pub struct Diagnostics {
    provider: Arc<dyn CloudProvider>,
    access: AccessConfig,
    subscription_id: String,
}

impl Diagnostics {
    pub fn new(
        provider: Arc<dyn CloudProvider>,
        access: AccessConfig,
        subscription_id: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            access,
            subscription_id: subscription_id.into(),
        }
    }

    /// Scan every NIC for public IPs and flag the one holding `target_ip`.
    ///
    /// Falls back to listing public IP resources when the NICs cannot be listed.
    /// Failures end up in the report instead of failing the call.
    pub async fn diagnose(&self, target_ip: &str) -> DiagnosticReport {
        let mut report = DiagnosticReport {
            target_ip: target_ip.to_string(),
            subscription_id: self.subscription_id.clone(),
            allowed_resource_groups: self.access.allowed_resource_groups.clone(),
            total_nics_scanned: None,
            vms_with_public_ips: Vec::new(),
            target_match: None,
            alternative_scan: None,
            target_match_alternative: None,
            errors: Vec::new(),
        };
        let target = target_ip.parse::<IpAddr>().ok();

        info!("Scanning network interfaces for {target_ip}");

        match self.provider.list_network_interfaces().await {
            Ok(nics) => {
                report.total_nics_scanned = Some(nics.len());

                for nic in &nics {
                    let resource_group = nic
                        .id
                        .parse::<ResourceId>()
                        .map(|id| id.resource_group().to_string())
                        .unwrap_or_default();

                    for ip_config in &nic.properties.ip_configurations {
                        let Some(public_ip_ref) = &ip_config.properties.public_ip_address else {
                            continue;
                        };

                        let address = match self.fetch_public_ip(&public_ip_ref.id).await {
                            Ok(ip) => ip.address().map(str::to_string),
                            Err(e) => {
                                warn!(public_ip = %public_ip_ref.id, "Could not fetch public IP details: {e}");
                                None
                            }
                        };

                        let entry = NicPublicIp {
                            nic_name: nic.name.clone(),
                            resource_group: resource_group.clone(),
                            public_ip: address.clone(),
                            public_ip_resource_id: public_ip_ref.id.clone(),
                            vm_attached: nic.properties.virtual_machine.is_some(),
                            vm_id: nic.properties.virtual_machine.as_ref().map(|vm| vm.id.clone()),
                        };

                        if matches_target(address.as_deref(), target_ip, target.as_ref()) {
                            if !self.access.is_allowed(&resource_group) {
                                report.errors.push(format!(
                                    "Resource group '{resource_group}' not in allowed list"
                                ));
                            }
                            report.target_match = Some(entry.clone());
                        }

                        report.vms_with_public_ips.push(entry);
                    }
                }
            }
            Err(e) => {
                error!("Error in diagnostic scan: {e}");
                report
                    .errors
                    .push(format!("Error scanning network interfaces: {e}"));
                self.scan_public_ips(&mut report, target.as_ref()).await;
            }
        }

        if report.target_match.is_none() {
            report
                .errors
                .push(format!("No network interface found with public IP {target_ip}"));
        }

        report
    }

    async fn scan_public_ips(&self, report: &mut DiagnosticReport, target: Option<&IpAddr>) {
        info!("Trying alternative approach, scanning all public IPs");

        let ips = match self.provider.list_public_ips().await {
            Ok(ips) => ips,
            Err(e) => {
                report
                    .errors
                    .push(format!("Alternative scan also failed: {e}"));
                return;
            }
        };

        let mut scan = Vec::new();
        for ip in ips {
            let Some(address) = ip.address() else {
                continue;
            };

            let summary = PublicIpSummary {
                name: ip.name.clone(),
                resource_group: ip
                    .id
                    .parse::<ResourceId>()
                    .map(|id| id.resource_group().to_string())
                    .unwrap_or_default(),
                ip_address: address.to_string(),
                associated_resource: ip.properties.ip_configuration.as_ref().map(|c| c.id.clone()),
            };

            if matches_target(Some(address), &report.target_ip, target) {
                report.target_match_alternative = Some(summary.clone());
            }
            scan.push(summary);
        }

        report.alternative_scan = Some(scan);
    }

    async fn fetch_public_ip(&self, raw_id: &str) -> crate::azure::Result<PublicIpAddress> {
        let id = raw_id
            .parse::<ResourceId>()
            .map_err(|e| AzureError::InvalidResponse {
                message: e.to_string(),
            })?;
        self.provider.get_public_ip(&id).await
    }
}

/// Compare as addresses when the target parses, as text otherwise
fn matches_target(address: Option<&str>, target_text: &str, target: Option<&IpAddr>) -> bool {
    let Some(address) = address else {
        return false;
    };

    match target {
        Some(target) => address.parse::<IpAddr>().is_ok_and(|addr| &addr == target),
        None => address == target_text,
    }
}
