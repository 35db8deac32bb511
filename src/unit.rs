//! The work unit contract and its recovery boundary.
//!
//! A work unit is any zero-argument closure that produces `Result<T, E>`.
//! Combinators own each unit only for as long as it takes to move it into
//! its execution context.

use crate::types::{Failure, Outcome, PanicPayload};
use std::panic::{self, AssertUnwindSafe};

/// A zero-argument callable that produces a value or a reported error.
///
/// Blanket-implemented for every `FnOnce() -> Result<T, E> + Send + 'static`,
/// so plain closures and [`BoxedUnit`]s both qualify.
pub trait WorkUnit<T, E>: FnOnce() -> Result<T, E> + Send + 'static {}

impl<T, E, F> WorkUnit<T, E> for F where F: FnOnce() -> Result<T, E> + Send + 'static {}

/// A type-erased work unit, for joining closures of different types.
///
/// ```
/// use settle::{BoxedUnit, wait_all};
///
/// let units: Vec<BoxedUnit<u32, String>> = vec![
///     Box::new(|| Ok(1)),
///     Box::new(move || Ok(2)),
/// ];
/// assert_eq!(wait_all(units), Ok(vec![1, 2]));
/// ```
pub type BoxedUnit<T, E> = Box<dyn FnOnce() -> Result<T, E> + Send + 'static>;

/// Runs `unit` behind a recovery boundary.
///
/// A returned `Err(e)` becomes [`Failure::Reported`]; a panic is caught and
/// becomes [`Failure::Fault`] carrying the panic message. Nothing escapes to
/// the caller.
pub fn run_guarded<T, E, F>(unit: F) -> Outcome<T, E>
where
    F: FnOnce() -> Result<T, E>,
{
    match panic::catch_unwind(AssertUnwindSafe(unit)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(Failure::Reported(err)),
        Err(panic) => Err(Failure::Fault(PanicPayload::from_panic(panic))),
    }
}
