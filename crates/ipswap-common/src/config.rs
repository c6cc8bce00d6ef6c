//! Configuration loading primitives shared by ipswap binaries

use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Failed to parse configuration: {details}")]
    ParseError { details: String },

    #[error("Missing required configuration value: {key}")]
    MissingValue { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

impl From<figment::Error> for ConfigurationError {
    fn from(err: figment::Error) -> Self {
        ConfigurationError::ParseError {
            details: err.to_string(),
        }
    }
}

/// Layered configuration loading implemented by each service's config type
pub trait ConfigLoader<T> {
    /// Load from defaults, an optional file and the environment
    fn load(path: Option<PathBuf>) -> Result<T, ConfigurationError>;

    /// Load with an explicit configuration file
    fn load_from_file(path: &Path) -> Result<T, ConfigurationError>;
}

/// Split a comma separated list, dropping blanks
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Accept either a sequence of strings or a single comma separated string.
///
/// Environment variables can only carry strings, while TOML files usually
/// carry arrays; both end up in the same `Vec<String>` field.
pub fn deserialize_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrList {
        String(String),
        List(Vec<String>),
    }

    Ok(match StringOrList::deserialize(deserializer)? {
        StringOrList::String(value) => split_list(&value),
        StringOrList::List(items) => items
            .iter()
            .map(|item| item.trim())
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
    })
}
