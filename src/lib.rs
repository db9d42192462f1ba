//! rJMX-Locator library
//!
//! Resolves where the JMX metrics interface of a cluster component instance
//! lives (host, port, protocol) and which RPC tag labels its metrics, from
//! cluster topology and per-service configuration.
//!
//! This crate computes addressing only; fetching and parsing JMX data is up
//! to the caller.

pub mod config;
pub mod error;
pub mod resolver;
pub mod store;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use config::{Config, ConfigError};
pub use error::{ResolveError, ResolveResult};
pub use resolver::{EndpointQuery, EndpointResolver, JmxProtocol, ResolvedEndpoint, RuleTable};
pub use store::{ConfigurationStore, Host, TopologyDirectory};

/// Initialize the logging subsystem
///
/// # Arguments
/// * `level` - Log level string (trace, debug, info, warn, error)
///
/// # Errors
/// Returns an error if the logging system fails to initialize
pub fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
