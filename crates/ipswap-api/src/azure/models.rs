//! Wire types for the Azure Resource Manager network and compute APIs
//!
//! Types that are written back with a read-modify-write `PUT` keep every
//! property they do not model in a flattened `extra` map, so the update does
//! not strip settings such as the subnet or private address of an IP
//! configuration.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::net::IpAddr;

/// Reference to another ARM resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubResource {
    pub id: String,
}

impl SubResource {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// One page of an ARM list response
#[derive(Debug, Clone, Deserialize)]
pub struct ArmList<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(rename = "nextLink", default)]
    pub next_link: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkInterface {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub properties: NetworkInterfaceProperties,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NetworkInterface {
    pub fn ip_configuration(&self, name: &str) -> Option<&IpConfiguration> {
        self.properties
            .ip_configurations
            .iter()
            .find(|cfg| cfg.name == name)
    }

    pub fn ip_configuration_mut(&mut self, name: &str) -> Option<&mut IpConfiguration> {
        self.properties
            .ip_configurations
            .iter_mut()
            .find(|cfg| cfg.name == name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkInterfaceProperties {
    #[serde(rename = "ipConfigurations", default)]
    pub ip_configurations: Vec<IpConfiguration>,
    #[serde(
        rename = "virtualMachine",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub virtual_machine: Option<SubResource>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub properties: IpConfigurationProperties,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IpConfigurationProperties {
    #[serde(
        rename = "publicIPAddress",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub public_ip_address: Option<SubResource>,
    #[serde(
        rename = "privateIPAddress",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub private_ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicIpAddress {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<Sku>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
    #[serde(default)]
    pub properties: PublicIpProperties,
}

impl PublicIpAddress {
    /// The allocated address, if the provider has assigned one
    pub fn address(&self) -> Option<&str> {
        self.properties.ip_address.as_deref()
    }

    /// Whether the allocated address equals `target` as an IP address
    pub fn has_address(&self, target: &IpAddr) -> bool {
        self.address()
            .and_then(|addr| addr.parse::<IpAddr>().ok())
            .is_some_and(|addr| &addr == target)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublicIpProperties {
    #[serde(rename = "ipAddress", default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(
        rename = "publicIPAllocationMethod",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub allocation_method: Option<String>,
    #[serde(
        rename = "provisioningState",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub provisioning_state: Option<String>,
    #[serde(
        rename = "ipConfiguration",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ip_configuration: Option<SubResource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sku {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
}

/// Body of a public IP create request
#[derive(Debug, Clone, Serialize)]
pub struct PublicIpRequest {
    pub location: String,
    pub sku: Sku,
    pub tags: HashMap<String, String>,
    pub properties: PublicIpRequestProperties,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicIpRequestProperties {
    #[serde(rename = "publicIPAllocationMethod")]
    pub allocation_method: String,
    #[serde(rename = "publicIPAddressVersion")]
    pub address_version: String,
}

impl PublicIpRequest {
    /// Static address of the same family as `like`, with the given SKU
    pub fn static_address(
        like: &IpAddr,
        location: impl Into<String>,
        sku: impl Into<String>,
        tags: HashMap<String, String>,
    ) -> Self {
        let version = if like.is_ipv6() { "IPv6" } else { "IPv4" };

        Self {
            location: location.into(),
            sku: Sku {
                name: sku.into(),
                tier: None,
            },
            tags,
            properties: PublicIpRequestProperties {
                allocation_method: "Static".to_string(),
                address_version: version.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VirtualMachine {
    pub id: String,
    pub name: String,
    pub location: String,
}

/// Status document returned by an `Azure-AsyncOperation` URL
#[derive(Debug, Clone, Deserialize)]
pub struct OperationStatus {
    pub status: String,
    #[serde(default)]
    pub error: Option<super::error::ArmErrorDetail>,
}
