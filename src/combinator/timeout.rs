//! Bounded-wait and delayed-wait join policies.

use super::{all, launch};
use crate::channel::{Received, lost};
use crate::spawn::Spawner;
use crate::tracing_compat::debug;
use crate::types::{Failure, Outcome, PanicPayload};
use crate::unit::{BoxedUnit, WorkUnit};
use std::thread;
use std::time::{Duration, Instant};

/// Returns the unit's outcome if it arrives within `duration`.
///
/// The deadline only changes what is reported: a unit that misses it keeps
/// running, and its late outcome is dropped with the channel buffer.
pub(crate) fn bounded<T, E, F>(spawner: &Spawner, unit: F, duration: Duration) -> Outcome<T, E>
where
    F: WorkUnit<T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    match launch(spawner, vec![unit]).recv_timeout(duration) {
        Received::Outcome(indexed) => indexed.outcome,
        Received::TimedOut => {
            debug!(?duration, "deadline exceeded; unit left running");
            Err(Failure::DeadlineExceeded(duration))
        }
        Received::Lost => Err(lost()),
    }
}

/// Joins the unit with a timer through the settle-all policy, so the call
/// never returns before `duration` has elapsed. If the timer's thread cannot
/// be spawned, the caller sleeps out the rest of the delay itself.
pub(crate) fn delayed<T, E, F>(spawner: &Spawner, unit: F, duration: Duration) -> Outcome<T, E>
where
    F: WorkUnit<T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    let started = Instant::now();
    let units: Vec<BoxedUnit<Option<T>, E>> = vec![
        Box::new(move || unit().map(Some)),
        Box::new(move || {
            thread::sleep(duration);
            Ok(None)
        }),
    ];

    let mut settled = all::settle_all(spawner, units).into_iter();
    let outcome = settled.next();
    if let Some(Err(Failure::Spawn(_))) = settled.next() {
        let remaining = duration.saturating_sub(started.elapsed());
        debug!(?remaining, "timer context unavailable; delaying on caller");
        thread::sleep(remaining);
    }

    match outcome {
        Some(Ok(Some(value))) => Ok(value),
        Some(Err(failure)) => Err(failure),
        Some(Ok(None)) | None => Err(Failure::Fault(PanicPayload::new(
            "delayed unit settled without a value",
        ))),
    }
}
