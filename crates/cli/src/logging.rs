use eyre::eyre;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LoggingSection;

/// Installs the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init(logging: &LoggingSection) -> eyre::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&logging.level)?,
    };

    let installed = if logging.json {
        fmt().json().with_env_filter(filter).try_init()
    } else {
        fmt().with_env_filter(filter).try_init()
    };
    installed.map_err(|err| eyre!("failed to install tracing subscriber: {err}"))
}
