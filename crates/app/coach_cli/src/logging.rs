use tracing_subscriber::EnvFilter;

use crate::{Error, Result};

/// Used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info,coach_client=debug,coach_core=debug";

/// Logs go to stderr so stdout only carries command output.
pub fn init() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .map_err(|e| Error::Logging(e.to_string()))?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))?;

    Ok(())
}
