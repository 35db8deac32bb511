//! First-outcome join policies: single wait and race.

use super::launch;
use crate::channel::lost;
use crate::spawn::Spawner;
use crate::tracing_compat::debug;
use crate::types::{Failure, Outcome};
use crate::unit::WorkUnit;

/// Runs one unit in its own context and blocks on the rendezvous.
pub(crate) fn single<T, E, F>(spawner: &Spawner, unit: F) -> Outcome<T, E>
where
    F: WorkUnit<T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    launch(spawner, vec![unit])
        .recv()
        .map_or_else(|| Err(lost()), |indexed| indexed.outcome)
}

/// Returns the first outcome observed on the channel, never a merge.
pub(crate) fn race<T, E, F, I>(spawner: &Spawner, units: I) -> Outcome<T, E>
where
    I: IntoIterator<Item = F>,
    F: WorkUnit<T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    let units: Vec<F> = units.into_iter().collect();
    if units.is_empty() {
        return Err(Failure::NoUnits);
    }

    let receiver = launch(spawner, units);
    match receiver.recv() {
        Some(first) => {
            debug!(winner = first.index, "race settled");
            first.outcome
        }
        None => Err(lost()),
    }
}
