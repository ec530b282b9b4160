// SPDX-License-Identifier: MIT OR Apache-2.0
//! Log output for tests.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_TEST_LOG_FILTER: &str = "warn";

/// Install a test-friendly `tracing` subscriber once per process.
///
/// Honors `RUST_LOG`, otherwise logs warnings and above. Output goes through
/// the test writer so it is captured per test. A subscriber installed by
/// someone else first is left alone.
pub fn init_test_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_TEST_LOG_FILTER));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
