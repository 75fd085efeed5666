//! Structured logging using **tracing**.
//!
//! Library code only emits events through `tracing` macros; binaries pick
//! a subscriber once at startup. Both subscribers write to stderr so stdout
//! stays clean for graph and report output.

use tracing_subscriber::EnvFilter;

/// Initializes a JSON subscriber for machine-readable logs.
///
/// # Environment Variables
/// - `RUST_LOG`: Controls log filtering (e.g., `RUST_LOG=callscope_core=debug`)
pub fn init_structured_logging() {
    tracing_subscriber::fmt()
        .json()
        .with_ansi(false)
        .with_level(true)
        .with_target(true)
        .with_current_span(true)
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

/// Initializes a human-readable subscriber.
///
/// `RUST_LOG` wins when set; otherwise `verbose` selects `debug` (per-query
/// timings) over the default `warn`.
pub fn init_pretty_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "callscope_core=debug,callscope=debug"
    } else {
        "warn"
    }
}
