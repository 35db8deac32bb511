//! Test helpers: one-time log subscriber setup and logging assertions.
//!
//! Compiled for unit tests and, through the `test-internals` feature, for the
//! integration tests under `tests/`.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

#[doc(hidden)]
pub use tracing;

static INIT: Once = Once::new();

/// Default filter when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "settle=debug";

/// Installs a test-friendly `tracing` subscriber once per process.
///
/// Honors `RUST_LOG`; output goes through the libtest capture writer so it
/// only shows for failing tests.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_test_writer()
            .try_init();
    });
}

/// Logs the start of a named test phase.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        $crate::test_utils::tracing::info!(phase = %$name, "test phase started");
    };
}

/// Logs the successful end of a named test.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        $crate::test_utils::tracing::info!(test = %$name, "test complete");
    };
}

/// Asserts a condition, logging the expected and actual values either way.
#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $msg:expr, $expected:expr, $actual:expr) => {{
        let ok: bool = $cond;
        let expected = &$expected;
        let actual = &$actual;
        $crate::test_utils::tracing::debug!(
            ok,
            expected = ?expected,
            actual = ?actual,
            "{}",
            $msg
        );
        assert!(ok, "{}: expected {:?}, got {:?}", $msg, expected, actual);
    }};
}
