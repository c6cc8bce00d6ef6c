//! Configuration module for the ipswap API
//!
//! Values are layered, later sources winning:
//! defaults, TOML file, `IPSWAP_*` variables (nested with `__`), the
//! `AZURE_*` variables mapped into `[azure]`, and `ALLOWED_RESOURCE_GROUPS`.

mod azure;
mod server;

pub use azure::{AzureConfig, AzureCredentials, SecretString};
pub use server::ServerConfig;

use ipswap_common::config::deserialize_list;
use ipswap_common::{ConfigLoader, ConfigurationError};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG_FILE: &str = "ipswap.toml";
const ENV_PREFIX: &str = "IPSWAP_";

/// Settings for the public IP resources created during a rotation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    /// SKU of new public IPs
    pub ip_sku: String,

    /// Prefix of generated public IP names, followed by 8 hex characters
    pub ip_name_prefix: String,

    /// Tags applied to new public IPs
    pub tags: HashMap<String, String>,
}

impl Default for RotationConfig {
    fn default() -> Self {
        let tags = HashMap::from([
            ("CreatedBy".to_string(), "IPChangeAPI".to_string()),
            ("Purpose".to_string(), "VM-IP-Replacement".to_string()),
        ]);

        Self {
            ip_sku: "Standard".to_string(),
            ip_name_prefix: "ip-".to_string(),
            tags,
        }
    }
}

/// Restrictions on which VMs may be rotated
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Resource groups whose VMs may be rotated; empty allows all
    #[serde(deserialize_with = "deserialize_list")]
    pub allowed_resource_groups: Vec<String>,
}

impl AccessConfig {
    pub fn is_allowed(&self, resource_group: &str) -> bool {
        self.allowed_resource_groups.is_empty()
            || self
                .allowed_resource_groups
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(resource_group))
    }
}

/// Main configuration structure for the ipswap API
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Azure credentials and client settings
    pub azure: AzureConfig,

    /// New public IP settings
    pub rotation: RotationConfig,

    /// Resource group restrictions
    pub access: AccessConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigurationError> {
        match config_path {
            Some(path) => <Config as ConfigLoader<Config>>::load_from_file(path),
            None => <Config as ConfigLoader<Config>>::load(None),
        }
    }

    /// Generate example configuration file
    pub fn generate_example() -> Result<String, ConfigurationError> {
        let config = Self::default();
        toml::to_string_pretty(&config).map_err(|e| ConfigurationError::ParseError {
            details: format!("Failed to serialize config: {e}"),
        })
    }

    /// Check the values the service cannot start without
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.azure.credentials()?;

        if self.server.request_timeout == 0 {
            return Err(ConfigurationError::InvalidValue {
                key: "server.request_timeout".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        if self.rotation.ip_sku.trim().is_empty() {
            return Err(ConfigurationError::InvalidValue {
                key: "rotation.ip_sku".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        if let Some(key) = &self.server.function_key {
            if key.is_empty() {
                return Err(ConfigurationError::InvalidValue {
                    key: "server.function_key".to_string(),
                    reason: "must not be blank when set".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout)
    }

    fn figment(file: &Path) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Env::prefixed("AZURE_").map(|key| format!("azure.{key}").into()))
            .merge(
                Env::raw()
                    .only(&["ALLOWED_RESOURCE_GROUPS"])
                    .map(|_| "access.allowed_resource_groups".into()),
            )
    }
}

impl ConfigLoader<Config> for Config {
    fn load(path: Option<PathBuf>) -> Result<Config, ConfigurationError> {
        let file = path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Ok(Self::figment(&file).extract()?)
    }

    fn load_from_file(path: &Path) -> Result<Config, ConfigurationError> {
        Ok(Self::figment(path).extract()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    const AZURE_VARS: [&str; 5] = [
        "AZURE_SUBSCRIPTION_ID",
        "AZURE_TENANT_ID",
        "AZURE_CLIENT_ID",
        "AZURE_CLIENT_SECRET",
        "ALLOWED_RESOURCE_GROUPS",
    ];

    fn clear_env() {
        for var in AZURE_VARS {
            std::env::remove_var(var);
        }
        std::env::remove_var("IPSWAP_SERVER__REQUEST_TIMEOUT");
    }

    fn missing_file() -> PathBuf {
        PathBuf::from("/nonexistent/ipswap-test.toml")
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.bind_address.port(), 7071);
        assert_eq!(config.rotation.ip_sku, "Standard");
        assert_eq!(config.rotation.tags["CreatedBy"], "IPChangeAPI");
        assert!(config.access.allowed_resource_groups.is_empty());
        assert!(config.server.function_key.is_none());
    }

    #[test]
    fn test_config_serialization() {
        let example = Config::generate_example().unwrap();
        let deserialized: Config = toml::from_str(&example).unwrap();

        assert_eq!(
            deserialized.server.bind_address,
            Config::default().server.bind_address
        );
        assert_eq!(
            deserialized.azure.resource_manager_endpoint,
            "https://management.azure.com"
        );
    }

    #[test]
    fn test_duration_conversions() {
        let config = Config::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(300));
        assert_eq!(config.azure.http_timeout(), Duration::from_secs(30));
        assert_eq!(config.azure.poll_interval(), Duration::from_secs(2));
    }

    #[test]
    fn test_access_allow_list() {
        let open = AccessConfig::default();
        assert!(open.is_allowed("anything"));

        let restricted = AccessConfig {
            allowed_resource_groups: vec!["prod-rg".to_string()],
        };
        assert!(restricted.is_allowed("PROD-RG"));
        assert!(!restricted.is_allowed("dev-rg"));
    }

    #[test]
    #[serial]
    fn test_azure_env_vars_map_into_azure_section() {
        clear_env();
        std::env::set_var("AZURE_SUBSCRIPTION_ID", "sub-1");
        std::env::set_var("AZURE_TENANT_ID", "tenant-1");
        std::env::set_var("AZURE_CLIENT_ID", "client-1");
        std::env::set_var("AZURE_CLIENT_SECRET", "secret-1");
        std::env::set_var("ALLOWED_RESOURCE_GROUPS", "rg-a, rg-b");

        let config = Config::load(Some(&missing_file())).unwrap();
        clear_env();

        assert_eq!(config.azure.subscription_id, "sub-1");
        assert_eq!(config.azure.client_secret.expose(), "secret-1");
        assert_eq!(config.access.allowed_resource_groups, vec!["rg-a", "rg-b"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_missing_credentials_fail_validation() {
        clear_env();
        std::env::set_var("AZURE_SUBSCRIPTION_ID", "sub-1");

        let config = Config::load(Some(&missing_file())).unwrap();
        clear_env();

        match config.validate() {
            Err(ConfigurationError::MissingValue { key }) => assert_eq!(key, "AZURE_TENANT_ID"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    #[serial]
    fn test_file_then_env_precedence() {
        clear_env();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
request_timeout = 60

[azure]
subscription_id = "from-file"

[access]
allowed_resource_groups = ["file-rg"]
"#
        )
        .unwrap();

        std::env::set_var("IPSWAP_SERVER__REQUEST_TIMEOUT", "90");
        std::env::set_var("AZURE_SUBSCRIPTION_ID", "from-env");

        let config = Config::load(Some(file.path())).unwrap();
        clear_env();

        assert_eq!(config.server.request_timeout, 90);
        assert_eq!(config.azure.subscription_id, "from-env");
        assert_eq!(config.access.allowed_resource_groups, vec!["file-rg"]);
    }

    #[test]
    fn test_zero_request_timeout_is_rejected() {
        let mut config = Config::default();
        config.azure.subscription_id = "sub".to_string();
        config.azure.tenant_id = "tenant".to_string();
        config.azure.client_id = "client".to_string();
        config.azure.client_secret = "secret".into();
        config.server.request_timeout = 0;

        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidValue { .. })
        ));
    }
}
