//! Stderr logging for the front-ends.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use libschroot::verbosity::{self, Verbosity};

const LOG_LEVEL_ENV_NAME: &str = "SCHROOT_LOG_LEVEL";

/// Install the subscriber. `-v` turns on debug output, `-q` leaves only
/// errors; `SCHROOT_LOG_LEVEL` overrides both.
pub fn init(quiet: bool, verbose: bool) -> Result<()> {
    let level = match (quiet, verbose) {
        (_, true) => {
            verbosity::set(Verbosity::Verbose);
            "debug"
        }
        (true, false) => {
            verbosity::set(Verbosity::Quiet);
            "error"
        }
        (false, false) => {
            verbosity::set(Verbosity::Normal);
            "warn"
        }
    };

    let filter = EnvFilter::try_from_env(LOG_LEVEL_ENV_NAME)
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to initialise logging: {err}"))?;

    Ok(())
}
