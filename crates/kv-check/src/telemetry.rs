//! Logging for `kv-check`.
//!
//! The tool runs once and exits, so events go to stderr as flat JSON lines.
//! Stdout stays free for whatever wraps the check (init containers, CI steps).

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` wins over `log_level`.
pub fn init(log_level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(log_level)
            .map_err(|e| anyhow!("LOG_LEVEL {log_level:?} is not a valid filter: {e}"))?,
    };

    tracing_subscriber::fmt()
        .json()
        .flatten_event(true)
        .with_current_span(false)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow!("tracing subscriber already installed: {e}"))
}
