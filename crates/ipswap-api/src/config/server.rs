//! HTTP server configuration

use super::SecretString;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to
    pub bind_address: SocketAddr,

    /// Upper bound for a single request, in seconds
    pub request_timeout: u64,

    /// Access key required as `?code=` or `x-functions-key` on every `/api` call.
    /// Unset means the key is enforced in front of the service, if at all.
    pub function_key: Option<SecretString>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 7071)),
            request_timeout: 300,
            function_key: None,
        }
    }
}
