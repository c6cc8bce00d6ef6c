//! Parsing of Azure Resource Manager resource identifiers
//!
//! ARM ids have the shape
//! `/subscriptions/{sub}/resourceGroups/{rg}/providers/{namespace}/{type}/{name}`
//! and may carry child segments (`.../networkInterfaces/{nic}/ipConfigurations/{cfg}`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResourceIdError {
    #[error("Resource id is empty")]
    Empty,

    #[error("Resource id {0} has no resourceGroups segment")]
    MissingResourceGroup(String),

    #[error("Resource id {0} has no provider segment")]
    MissingProvider(String),
}

/// A parsed ARM resource id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId {
    raw: String,
    subscription_id: String,
    resource_group: String,
    namespace: String,
    resource_type: String,
    name: String,
}

impl ResourceId {
    /// Build the id of a top-level resource
    pub fn new(
        subscription_id: &str,
        resource_group: &str,
        namespace: &str,
        resource_type: &str,
        name: &str,
    ) -> Self {
        Self {
            raw: format!(
                "/subscriptions/{subscription_id}/resourceGroups/{resource_group}/providers/{namespace}/{resource_type}/{name}"
            ),
            subscription_id: subscription_id.to_string(),
            resource_group: resource_group.to_string(),
            namespace: namespace.to_string(),
            resource_type: resource_type.to_string(),
            name: name.to_string(),
        }
    }

    /// Id of a `Microsoft.Network/publicIPAddresses` resource
    pub fn public_ip(subscription_id: &str, resource_group: &str, name: &str) -> Self {
        Self::new(
            subscription_id,
            resource_group,
            "Microsoft.Network",
            "publicIPAddresses",
            name,
        )
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    pub fn resource_group(&self) -> &str {
        &self.resource_group
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Type of the top-level resource (e.g. `networkInterfaces`)
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Name of the last segment, which for child ids is the child's name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FromStr for ResourceId {
    type Err = ResourceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ResourceIdError::Empty);
        }

        let segments: Vec<&str> = trimmed.split('/').filter(|p| !p.is_empty()).collect();

        let value_after = |key: &str| {
            segments
                .iter()
                .position(|segment| segment.eq_ignore_ascii_case(key))
                .and_then(|idx| segments.get(idx + 1).copied())
        };

        let subscription_id = value_after("subscriptions").unwrap_or_default();
        let resource_group = value_after("resourceGroups")
            .ok_or_else(|| ResourceIdError::MissingResourceGroup(s.to_string()))?;

        let provider_idx = segments
            .iter()
            .position(|segment| segment.eq_ignore_ascii_case("providers"))
            .ok_or_else(|| ResourceIdError::MissingProvider(s.to_string()))?;
        let namespace = segments
            .get(provider_idx + 1)
            .ok_or_else(|| ResourceIdError::MissingProvider(s.to_string()))?;
        let resource_type = segments
            .get(provider_idx + 2)
            .ok_or_else(|| ResourceIdError::MissingProvider(s.to_string()))?;
        let name = segments
            .last()
            .filter(|_| segments.len() > provider_idx + 3)
            .ok_or_else(|| ResourceIdError::MissingProvider(s.to_string()))?;

        Ok(Self {
            raw: trimmed.to_string(),
            subscription_id: subscription_id.to_string(),
            resource_group: resource_group.to_string(),
            namespace: namespace.to_string(),
            resource_type: resource_type.to_string(),
            name: name.to_string(),
        })
    }
}

impl TryFrom<String> for ResourceId {
    type Error = ResourceIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.raw
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_public_ip_id() {
        let id: ResourceId = "/subscriptions/sub-1/resourceGroups/my-rg/providers/Microsoft.Network/publicIPAddresses/my-ip"
            .parse()
            .unwrap();

        assert_eq!(id.subscription_id(), "sub-1");
        assert_eq!(id.resource_group(), "my-rg");
        assert_eq!(id.namespace(), "Microsoft.Network");
        assert_eq!(id.resource_type(), "publicIPAddresses");
        assert_eq!(id.name(), "my-ip");
    }

    #[test]
    fn test_parse_child_resource_uses_last_segment() {
        let id: ResourceId = "/subscriptions/sub-1/resourceGroups/my-rg/providers/Microsoft.Network/networkInterfaces/nic-1/ipConfigurations/ipconfig1"
            .parse()
            .unwrap();

        assert_eq!(id.resource_type(), "networkInterfaces");
        assert_eq!(id.name(), "ipconfig1");
    }

    #[test]
    fn test_parse_is_case_insensitive_on_keys() {
        let id: ResourceId = "/SUBSCRIPTIONS/sub-1/RESOURCEGROUPS/My-RG/providers/Microsoft.Compute/virtualMachines/my-vm"
            .parse()
            .unwrap();

        assert_eq!(id.resource_group(), "My-RG");
        assert_eq!(id.name(), "my-vm");
    }

    #[test]
    fn test_parse_rejects_malformed_ids() {
        assert_eq!("".parse::<ResourceId>(), Err(ResourceIdError::Empty));
        assert!(matches!(
            "/subscriptions/sub-1/providers/Microsoft.Network/publicIPAddresses/x".parse::<ResourceId>(),
            Err(ResourceIdError::MissingResourceGroup(_))
        ));
        assert!(matches!(
            "/subscriptions/sub-1/resourceGroups/rg".parse::<ResourceId>(),
            Err(ResourceIdError::MissingProvider(_))
        ));
        assert!(matches!(
            "/subscriptions/sub-1/resourceGroups/rg/providers/Microsoft.Network/publicIPAddresses"
                .parse::<ResourceId>(),
            Err(ResourceIdError::MissingProvider(_))
        ));
    }

    #[test]
    fn test_constructed_id_round_trips() {
        let id = ResourceId::public_ip("sub-1", "my-rg", "ip-1234abcd");
        let parsed: ResourceId = id.as_str().parse().unwrap();
        assert_eq!(parsed, id);
    }
}
