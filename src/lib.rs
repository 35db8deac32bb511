//! Settle: thread-backed combinators for running work concurrently and joining outcomes.
//!
//! # Overview
//!
//! A *work unit* is any `FnOnce() -> Result<T, E> + Send + 'static`. Every
//! combinator runs each unit on its own OS thread behind a panic recovery
//! boundary, then applies a join policy to the outcomes as they arrive.
//!
//! ```
//! use std::thread;
//! use std::time::Duration;
//!
//! let values = settle::wait_all([(1_u64, "a"), (20, "b"), (10, "c")].map(|(ms, name)| {
//!     move || {
//!         thread::sleep(Duration::from_millis(ms));
//!         Ok::<_, String>(name)
//!     }
//! }));
//! assert_eq!(values, Ok(vec!["a", "b", "c"]));
//! ```
//!
//! # Guarantees
//!
//! - **Input order**: `wait_all`, `wait_all_settled`, and the failure list of
//!   `wait_any` are ordered by input position, never by completion order
//! - **Fault isolation**: a panicking unit becomes [`Failure::Fault`]; it never
//!   unwinds into the caller
//! - **Single assignment**: an [`AsyncTask`] settles once; later calls are no-ops
//! - **Serial handling**: a [`SerialQueue`] never runs two handler calls at once
//!
//! Combinators never interrupt a running unit. See
//! [`combinator`](mod@combinator) for what happens to units that lose a race
//! or outlive a deadline, and [`combinator::cancellable`] for cooperative
//! cancellation.
//!
//! # Module Structure
//!
//! - [`combinator`](mod@combinator): `wait`, `wait_race`, `wait_any`, `wait_all`,
//!   `wait_all_settled`, `wait_timeout`, `wait_after`
//! - [`spawn`]: [`Spawner`], the configurable entry point for every combinator
//! - [`sync`]: [`AsyncTask`] and [`SerialQueue`]
//! - [`throttle`]: [`Throttle`] and keyed [`ThrottleRegistry`] caches
//! - [`types`]: Outcomes, failures, and cancellation tokens
//! - [`config`]: Thread and queue configuration
//! - [`tracing_compat`]: Optional tracing integration (requires `tracing-integration` feature)

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]

mod channel;
pub mod combinator;
pub mod config;
pub mod spawn;
pub mod sync;
pub mod throttle;
pub mod tracing_compat;
pub mod types;
pub mod unit;

#[cfg(any(test, feature = "test-internals"))]
pub mod test_utils;

pub use combinator::cancellable::{
    CancellableUnit, all_with_token, any_with_token, race_with_token, timeout_with_token,
};
pub use combinator::{
    wait, wait_after, wait_all, wait_all_settled, wait_any, wait_race, wait_timeout,
};
pub use config::{ConfigError, QueueCapacity, QueueConfig, SpawnConfig};
pub use spawn::Spawner;
pub use sync::{AsyncTask, PushError, QueueError, QueueStats, SerialQueue, TaskState};
pub use throttle::{Throttle, ThrottleError, ThrottleRegistry};
pub use types::{CancelKind, CancelReason, CancelToken, Failure, Outcome, PanicPayload};
pub use unit::{BoxedUnit, WorkUnit, run_guarded};
