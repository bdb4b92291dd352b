//! Tracing setup for the CLI.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Initialize the global subscriber.
///
/// Precedence: `MOLT_LOG` env, then the config file filter, then a level
/// derived from the CLI verbosity flags. Safe to call more than once;
/// later calls are no-ops.
pub fn init(verbose: u8, quiet: bool, logging: &LoggingConfig) {
    let fallback = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_env("MOLT_LOG").unwrap_or_else(|_| {
        match &logging.filter {
            Some(directive) => EnvFilter::new(directive),
            None => EnvFilter::new(fallback),
        }
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
