//! Shared building blocks for ipswap binaries: logging setup and layered
//! configuration loading.

pub mod config;
pub mod logging;

pub use config::{ConfigLoader, ConfigurationError};
