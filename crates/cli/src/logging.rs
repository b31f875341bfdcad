//! Logging setup for the CLI.
//!
//! Engine diagnostics go through the `log` facade; the subscriber installed
//! here picks them up and writes to stderr so `--json` stdout stays clean.

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize logging.
///
/// `RUST_LOG` overrides the level (default: `warn`, or `debug` with `--verbose`),
/// e.g. `RUST_LOG=reqcost_engine=debug`.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .without_time()
        .try_init();
}
