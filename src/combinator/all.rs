//! All-or-nothing and settle-all join policies.

use super::launch;
use crate::channel::{Indexed, lost};
use crate::spawn::Spawner;
use crate::tracing_compat::debug;
use crate::types::{Failure, Outcome};
use crate::unit::WorkUnit;

/// Returns every value in input order, or the first failure observed.
///
/// On failure the remaining units are left running; their outcomes land in
/// the channel buffer and are dropped with it.
pub(crate) fn all_or_nothing<T, E, F, I>(spawner: &Spawner, units: I) -> Result<Vec<T>, Failure<E>>
where
    I: IntoIterator<Item = F>,
    F: WorkUnit<T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    let units: Vec<F> = units.into_iter().collect();
    let count = units.len();
    let mut values: Vec<Option<T>> = (0..count).map(|_| None).collect();
    let receiver = launch(spawner, units);

    for _ in 0..count {
        match receiver.recv() {
            Some(Indexed {
                index,
                outcome: Ok(value),
            }) => values[index] = Some(value),
            Some(Indexed {
                outcome: Err(failure),
                ..
            }) => {
                debug!(units = count, "failure observed; leaving remaining units running");
                return Err(failure);
            }
            None => return Err(lost()),
        }
    }

    values
        .into_iter()
        .map(|value| value.ok_or_else(lost))
        .collect()
}

/// Waits for every unit and returns one outcome per input position.
pub(crate) fn settle_all<T, E, F, I>(spawner: &Spawner, units: I) -> Vec<Outcome<T, E>>
where
    I: IntoIterator<Item = F>,
    F: WorkUnit<T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    let units: Vec<F> = units.into_iter().collect();
    let count = units.len();
    let mut outcomes: Vec<Option<Outcome<T, E>>> = (0..count).map(|_| None).collect();
    let receiver = launch(spawner, units);

    for _ in 0..count {
        match receiver.recv() {
            Some(Indexed { index, outcome }) => outcomes[index] = Some(outcome),
            None => break,
        }
    }

    outcomes
        .into_iter()
        .map(|outcome| outcome.unwrap_or_else(|| Err(lost())))
        .collect()
}
