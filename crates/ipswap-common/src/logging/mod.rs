//! Unified logging initialization for all ipswap binaries
//!
//! This module provides a standardized logging setup that respects the following priority order:
//! 1. CLI flags (`-v/-q`) - highest priority
//! 2. RUST_LOG environment variable
//! 3. Binary-specific defaults - lowest priority

use anyhow::Result;
use clap_verbosity_flag::{LogLevel, Verbosity};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging with the specified verbosity level and default filter.
///
/// # Arguments
///
/// * `verbosity` - The verbosity flags from clap (-v/-q)
/// * `default_filter` - The default filter string if no CLI flags or RUST_LOG are set
///
/// # Example
///
/// ```no_run
/// use clap::Parser;
/// use clap_verbosity_flag::{Verbosity, InfoLevel};
/// use ipswap_common::logging;
///
/// #[derive(Parser)]
/// struct Args {
///     #[clap(flatten)]
///     verbosity: Verbosity<InfoLevel>,
/// }
///
/// let args = Args::parse();
/// logging::init_logging(&args.verbosity, "ipswap_api=info").unwrap();
/// ```
pub fn init_logging<L: LogLevel>(verbosity: &Verbosity<L>, default_filter: &str) -> Result<()> {
    let filter = build_filter(verbosity, default_filter)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true) // Show module path
                .with_file(true) // Show source file
                .with_line_number(true) // Show line number
                .compact(), // Use compact format
        )
        .init();

    Ok(())
}

/// Resolve the filter from explicit flags, then RUST_LOG, then the default.
fn build_filter<L: LogLevel>(verbosity: &Verbosity<L>, default_filter: &str) -> Result<EnvFilter> {
    if verbosity.is_present() {
        let directive = verbosity
            .log_level()
            .map(|level| level.to_string().to_lowercase())
            .unwrap_or_else(|| "off".to_string());
        return Ok(EnvFilter::try_new(directive)?);
    }

    Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap_verbosity_flag::InfoLevel;

    #[test]
    fn test_explicit_verbosity_builds_filter() {
        let verbosity = Verbosity::<InfoLevel>::new(2, 0);
        assert!(build_filter(&verbosity, "ipswap_api=info").is_ok());
    }

    #[test]
    fn test_quiet_verbosity_builds_filter() {
        let verbosity = Verbosity::<InfoLevel>::new(0, 4);
        assert!(build_filter(&verbosity, "ipswap_api=info").is_ok());
    }

    #[test]
    fn test_default_filter_without_flags() {
        let verbosity = Verbosity::<InfoLevel>::new(0, 0);
        assert!(build_filter(&verbosity, "ipswap_api=debug").is_ok());
    }
}
