//! Logging setup.
//! Used by: main.

use tracing_subscriber::EnvFilter;

/// Logs go to stderr so command output on stdout stays clean. `RUST_LOG`
/// overrides the default `info` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
