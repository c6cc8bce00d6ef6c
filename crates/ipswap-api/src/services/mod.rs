//! Service layer for the ipswap API
//!
//! The locator finds the VM that owns a public IP, the rotator swaps that IP
//! for a fresh one, and diagnostics reports what the locator can see.

pub mod diagnostics;
pub mod locator;
pub mod rotator;

#[cfg(test)]
pub(crate) mod fixtures;

pub use diagnostics::{DiagnosticReport, Diagnostics};
pub use locator::{VmLocator, VmMatch};
pub use rotator::{ChangeResult, IpRotator};

use crate::azure::AzureError;
use std::net::IpAddr;

/// Errors raised while locating or rotating a VM's public IP
#[derive(Debug, thiserror::Error)]
pub enum RotationError {
    #[error("Invalid IP address format")]
    InvalidIp(String),

    #[error("VM not found")]
    VmNotFound { ip: String },

    /// The NIC changed between lookup and update
    #[error("IP configuration {ip_configuration} no longer exists on {nic}")]
    IpConfigurationMissing {
        nic: String,
        ip_configuration: String,
    },

    #[error("Public IP {name} has no address after creation")]
    NoAddressAllocated { name: String },

    /// Lookup did not finish before any resource was touched
    #[error("Request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error(transparent)]
    Cloud(#[from] AzureError),
}

/// Parse an address literal, rejecting anything that is not plain IPv4 or IPv6
pub fn parse_ip(value: &str) -> Result<IpAddr, RotationError> {
    value
        .parse()
        .map_err(|_| RotationError::InvalidIp(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ip() {
        assert!(parse_ip("20.123.45.67").is_ok());
        assert!(parse_ip("2001:db8::1").is_ok());
        assert!(matches!(parse_ip("20.123.45"), Err(RotationError::InvalidIp(_))));
        assert!(matches!(parse_ip("my-vm"), Err(RotationError::InvalidIp(_))));
        assert!(matches!(parse_ip(""), Err(RotationError::InvalidIp(_))));
        assert!(matches!(parse_ip(" 1.2.3.4"), Err(RotationError::InvalidIp(_))));
    }
}
