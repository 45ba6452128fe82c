//! Diagnostic logging setup for the binary.

use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive, e.g. `trashday=debug`
pub const LOG_ENV: &str = "TRASHDAY_LOG";

/// Filter used when `TRASHDAY_LOG` is unset or invalid
pub fn default_filter(verbose: bool) -> EnvFilter {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    EnvFilter::default().add_directive(level.into())
}

/// Install a stderr subscriber. Warnings come out prefixed `WARN`, distinct
/// from the progress lines on stdout. Calling this twice is harmless.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| default_filter(verbose));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .without_time()
        .try_init();
}
