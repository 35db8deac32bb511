//! Succeed-any join policy.

use super::launch;
use crate::channel::{Indexed, lost};
use crate::spawn::Spawner;
use crate::tracing_compat::debug;
use crate::types::Failure;
use crate::unit::WorkUnit;

/// Returns the first successful value, or every failure in input order.
///
/// The failure list is only returned once all units have reported; failures
/// are placed by index as they arrive, so arrival order never leaks out.
pub(crate) fn first_success<T, E, F, I>(spawner: &Spawner, units: I) -> Result<T, Vec<Failure<E>>>
where
    I: IntoIterator<Item = F>,
    F: WorkUnit<T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    let units: Vec<F> = units.into_iter().collect();
    let count = units.len();
    let mut failures: Vec<Option<Failure<E>>> = (0..count).map(|_| None).collect();
    let receiver = launch(spawner, units);

    for _ in 0..count {
        match receiver.recv() {
            Some(Indexed {
                outcome: Ok(value),
                ..
            }) => {
                debug!(units = count, "first success observed");
                return Ok(value);
            }
            Some(Indexed {
                index,
                outcome: Err(failure),
            }) => failures[index] = Some(failure),
            None => break,
        }
    }

    Err(failures
        .into_iter()
        .map(|failure| failure.unwrap_or_else(lost))
        .collect())
}
