//! Tracing subscriber setup.
//!
//! Diagnostics go to stderr through `tracing-subscriber`'s fmt layer. `RUST_LOG`
//! takes precedence over the configured level.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use crate::ports::config_port::ConfigPort;

pub const DEFAULT_LOG_LEVEL: &str = "info";

fn build_filter(level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL))
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_logging(level: &str) {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = tracing_subscriber::registry()
        .with(build_filter(level))
        .with(fmt_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(level, "logging initialized");
    }
}

/// Level from `[logging] level`, falling back to [`DEFAULT_LOG_LEVEL`].
pub fn configured_level(config: &dyn ConfigPort) -> String {
    config
        .get_string("logging", "level")
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
}
