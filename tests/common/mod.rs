//! Shared helpers for the integration suites.

#![allow(dead_code, unused_imports)]

pub use settle::test_utils::init_test_logging;
pub use settle::{assert_with_log, test_complete, test_phase};

use std::thread;
use std::time::Duration;

/// A unit that sleeps for `ms` milliseconds and then returns `outcome`.
pub fn after<T, E>(ms: u64, outcome: Result<T, E>) -> impl FnOnce() -> Result<T, E> + Send + 'static
where
    T: Send + 'static,
    E: Send + 'static,
{
    move || {
        thread::sleep(Duration::from_millis(ms));
        outcome
    }
}

/// Boxed form of [`after`], for joining units alongside other closures.
pub fn boxed<T, E>(ms: u64, outcome: Result<T, E>) -> settle::BoxedUnit<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    Box::new(after(ms, outcome))
}
