//! Tracing subscriber setup
//!
//! Logs go to stderr so the binary's stdout carries only the answer.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::OrchestrationError;
use crate::Result;

/// Initialize the global subscriber. `level` takes precedence over `RUST_LOG`.
pub fn init_logging(level: Option<&str>) -> Result<()> {
    let default_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = level.unwrap_or(&default_level);

    let env_filter = EnvFilter::try_new(filter)
        .map_err(|e| OrchestrationError::ConfigError(format!("Invalid log filter: {}", e)))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| OrchestrationError::ConfigError(format!("Failed to init logging: {}", e)))?;

    Ok(())
}
