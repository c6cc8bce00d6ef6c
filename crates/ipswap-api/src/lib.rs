//! # ipswap API
//!
//! HTTP service that replaces the public IP address of an Azure virtual
//! machine. Given the address a VM currently answers on, it finds the VM,
//! allocates a new static public IP, attaches it to the same NIC IP
//! configuration and deletes the old address.

pub mod api;
pub mod azure;
pub mod config;
pub mod error;
pub mod server;
pub mod services;

pub use config::Config;
pub use error::{ApiError, Result};
pub use server::{AppState, Server};

/// Version of the ipswap-api crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
