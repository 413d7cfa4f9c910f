//! Log output for test binaries.
//!
//! Library code only emits `tracing` events; installing a subscriber is left
//! to the test binary, which calls [`init_test_logging`] at the top of each
//! test. Repeated calls are harmless.

use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "acceso=info";

/// Install a compact fmt subscriber writing through the test capture.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_test_logging() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .with_target(true)
        .compact()
        .try_init()
        .is_ok()
}

/// Install a JSON subscriber, for runs whose output is collected by a CI log
/// pipeline.
pub fn init_json_logging() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    fmt()
        .with_env_filter(filter)
        .json()
        .with_current_span(false)
        .try_init()
        .is_ok()
}
