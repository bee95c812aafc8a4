//! Logging bootstrap built on `tracing`

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the subscriber for the service binary
///
/// The filter comes from `RUST_LOG` (default: `info`), e.g.
/// `RUST_LOG=decision_hub=debug`.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Initialize logging for tests; safe to call repeatedly
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
