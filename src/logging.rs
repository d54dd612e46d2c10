//! Logging setup for the `specprep` binary.
//!
//! Diagnostics go to stderr through `tracing`, so CSV written to stdout stays
//! clean. `RUST_LOG` overrides the verbosity chosen on the command line.

use tracing_subscriber::EnvFilter;

use crate::errors::{PrepError, Result};

/// Filter directive for a `-v` count (negative for `-q`).
pub fn level_for(verbosity: i8) -> &'static str {
    match verbosity {
        i8::MIN..=-1 => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

pub fn init_logging(verbosity: i8) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for(verbosity)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| {
            PrepError::validation(format!("cannot install logger: {e}"))
                .with_context("operation", "init_logging")
        })
}
