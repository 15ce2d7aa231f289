//! Structured logging via `tracing`.
//!
//! Events go to stderr so that commands printing machine-readable output
//! (`plan`) keep stdout clean. Verbosity follows `RUST_LOG`, falling back to
//! the level passed in, e.g. `RUST_LOG=adaptive_images=debug`.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Later calls are no-ops.
pub fn init(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}
