//! Diagnostic logging for the binary.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to whoever embeds it. Diagnostics go to stderr so they never interleave
//! with the progress log or `--json` output on stdout.

use tracing_subscriber::EnvFilter;

/// Picks the default filter directive from the verbosity flags.
pub fn default_directive(verbose: bool, quiet: bool) -> &'static str {
    if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    }
}

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over the verbosity flags. Calling this more
/// than once is harmless; later calls leave the first subscriber in place.
pub fn init_logging(verbose: bool, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(false, false), "info");
        assert_eq!(default_directive(true, false), "debug");
        assert_eq!(default_directive(false, true), "warn");
    }
}
