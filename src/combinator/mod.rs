//! Combinators that run work units concurrently and join their outcomes.
//!
//! Each combinator spawns one execution context per unit and applies a join
//! policy over a shared outcome channel:
//!
//! - [`wait()`]: run one unit, wait for it
//! - [`wait_race`]: first outcome wins, success or failure
//! - [`wait_any`]: first success wins; all failures in input order otherwise
//! - [`wait_all`]: all values in input order, or the first observed failure
//! - [`wait_all_settled`]: every outcome, in input order
//! - [`wait_timeout`]: the unit's outcome, or a deadline failure
//! - [`wait_after`]: the unit's outcome, never before a minimum delay
//!
//! # Losers keep running
//!
//! None of these combinators cancel anything. Race losers, units still
//! running after an early `wait_all` failure, and a unit that outlives its
//! `wait_timeout` deadline all run to completion on their own threads; their
//! outcomes are discarded. A unit that never finishes leaks its thread.
//! The [`cancellable`] module offers opt-in variants that signal a
//! [`CancelToken`](crate::CancelToken) the units can observe.

pub(crate) mod all;
pub(crate) mod any;
pub mod cancellable;
pub(crate) mod first;
pub(crate) mod timeout;

use crate::channel::{OutcomeReceiver, outcome_channel};
use crate::spawn::Spawner;
use crate::tracing_compat::trace;
use crate::types::{Failure, Outcome};
use crate::unit::WorkUnit;
use std::time::Duration;

/// Spawns every unit and returns the receiver the join policy reads from.
pub(crate) fn launch<T, E, F>(spawner: &Spawner, units: Vec<F>) -> OutcomeReceiver<T, E>
where
    F: WorkUnit<T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    let (outcomes, receiver) = outcome_channel(units.len().max(1));
    trace!(units = units.len(), "launching execution contexts");
    for (index, unit) in units.into_iter().enumerate() {
        spawner.spawn_unit(index, unit, &outcomes);
    }
    receiver
}

/// Runs `unit` in another execution context and waits for its outcome.
///
/// ```
/// let greeting = settle::wait(|| Ok::<_, String>("Hello, World!"));
/// assert_eq!(greeting, Ok("Hello, World!"));
/// ```
pub fn wait<T, E, F>(unit: F) -> Outcome<T, E>
where
    F: WorkUnit<T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    first::single(&Spawner::default(), unit)
}

/// Runs every unit concurrently and returns whichever outcome arrives first.
///
/// Returns [`Failure::NoUnits`] when `units` is empty.
pub fn wait_race<T, E, F, I>(units: I) -> Outcome<T, E>
where
    I: IntoIterator<Item = F>,
    F: WorkUnit<T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    first::race(&Spawner::default(), units)
}

/// Runs every unit concurrently and returns the first successful value.
///
/// If every unit fails, the failures are returned ordered by input position.
/// An empty input yields an empty failure list.
pub fn wait_any<T, E, F, I>(units: I) -> Result<T, Vec<Failure<E>>>
where
    I: IntoIterator<Item = F>,
    F: WorkUnit<T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    any::first_success(&Spawner::default(), units)
}

/// Runs every unit concurrently and returns all values in input order.
///
/// Returns the first observed failure as soon as it arrives, without waiting
/// for the remaining units.
pub fn wait_all<T, E, F, I>(units: I) -> Result<Vec<T>, Failure<E>>
where
    I: IntoIterator<Item = F>,
    F: WorkUnit<T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    all::all_or_nothing(&Spawner::default(), units)
}

/// Runs every unit concurrently and returns one outcome per input position.
pub fn wait_all_settled<T, E, F, I>(units: I) -> Vec<Outcome<T, E>>
where
    I: IntoIterator<Item = F>,
    F: WorkUnit<T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    all::settle_all(&Spawner::default(), units)
}

/// Runs `unit` against a deadline.
///
/// Returns [`Failure::DeadlineExceeded`] if `duration` elapses first; the
/// unit keeps running and its eventual outcome is discarded.
pub fn wait_timeout<T, E, F>(unit: F, duration: Duration) -> Outcome<T, E>
where
    F: WorkUnit<T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    timeout::bounded(&Spawner::default(), unit, duration)
}

/// Runs `unit` and returns its outcome no sooner than `duration` from now.
pub fn wait_after<T, E, F>(unit: F, duration: Duration) -> Outcome<T, E>
where
    F: WorkUnit<T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    timeout::delayed(&Spawner::default(), unit, duration)
}
