//! Main entry point for the ipswap API

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use ipswap_api::{config::Config, server::Server, Result};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(
    name = "ipswap-api",
    about = "Rotate the public IP address of an Azure VM over HTTP",
    version,
    author
)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Generate example configuration file
    #[arg(long)]
    gen_config: bool,

    #[command(flatten)]
    verbosity: Verbosity<InfoLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_filter = format!("{}=info", env!("CARGO_BIN_NAME").replace('-', "_"));
    ipswap_common::logging::init_logging(&args.verbosity, &log_filter)?;

    if args.gen_config {
        let example_config = Config::generate_example()?;
        println!("{example_config}");
        return Ok(());
    }

    info!("Starting ipswap API v{}", ipswap_api::VERSION);

    let config = Config::load(args.config.as_deref())?;
    info!(
        "Configuration loaded, binding to {}",
        config.server.bind_address
    );

    let server = Server::new(config)?;

    info!("ipswap API initialized successfully");

    match server.run().await {
        Ok(()) => {
            info!("ipswap API shut down gracefully");
            Ok(())
        }
        Err(e) => {
            error!("ipswap API error: {}", e);
            Err(e)
        }
    }
}
