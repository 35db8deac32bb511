//! Cancellation-aware variants of the racing and fail-fast combinators.
//!
//! Each variant takes units that accept a [`CancelToken`] and signals that
//! token once the join has been decided, so losers and peers can stop early
//! by polling [`CancelToken::is_cancelled`]. Signalling is cooperative: a
//! unit that never looks at its token still runs to completion.
//!
//! ```
//! use settle::CancelToken;
//! use settle::combinator::cancellable::race_with_token;
//! use std::time::Duration;
//!
//! let token = CancelToken::new();
//! let winner = race_with_token(&token, [0_u64, 50].map(|ms| {
//!     move |token: CancelToken| {
//!         let deadline = std::time::Instant::now() + Duration::from_millis(ms);
//!         while std::time::Instant::now() < deadline && !token.is_cancelled() {
//!             std::thread::sleep(Duration::from_millis(1));
//!         }
//!         Ok::<_, ()>(ms)
//!     }
//! }));
//! assert_eq!(winner, Ok(0));
//! assert!(token.is_cancelled());
//! ```

use super::{all, any, first, timeout};
use crate::spawn::Spawner;
use crate::tracing_compat::debug;
use crate::types::{CancelReason, CancelToken, Failure, Outcome};
use crate::unit::WorkUnit;
use std::time::Duration;

/// A work unit that observes a shared [`CancelToken`].
pub trait CancellableUnit<T, E>: FnOnce(CancelToken) -> Result<T, E> + Send + 'static {}

impl<T, E, F> CancellableUnit<T, E> for F where F: FnOnce(CancelToken) -> Result<T, E> + Send + 'static
{}

fn bind<T, E, F>(token: &CancelToken, unit: F) -> impl WorkUnit<T, E>
where
    F: CancellableUnit<T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    let token = token.clone();
    move || unit(token)
}

fn bind_all<T, E, F, I>(token: &CancelToken, units: I) -> Vec<impl WorkUnit<T, E>>
where
    I: IntoIterator<Item = F>,
    F: CancellableUnit<T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    units.into_iter().map(|unit| bind(token, unit)).collect()
}

/// Like [`wait_race`](crate::wait_race); signals [`CancelReason::race_lost`]
/// once the first outcome arrives.
pub fn race_with_token<T, E, F, I>(token: &CancelToken, units: I) -> Outcome<T, E>
where
    I: IntoIterator<Item = F>,
    F: CancellableUnit<T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    Spawner::default().race_with_token(token, units)
}

/// Like [`wait_any`](crate::wait_any); signals [`CancelReason::race_lost`]
/// once a unit succeeds.
pub fn any_with_token<T, E, F, I>(token: &CancelToken, units: I) -> Result<T, Vec<Failure<E>>>
where
    I: IntoIterator<Item = F>,
    F: CancellableUnit<T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    Spawner::default().any_with_token(token, units)
}

/// Like [`wait_all`](crate::wait_all); signals
/// [`CancelReason::sibling_failed`] when a unit fails.
pub fn all_with_token<T, E, F, I>(token: &CancelToken, units: I) -> Result<Vec<T>, Failure<E>>
where
    I: IntoIterator<Item = F>,
    F: CancellableUnit<T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    Spawner::default().all_with_token(token, units)
}

/// Like [`wait_timeout`](crate::wait_timeout); signals
/// [`CancelReason::timeout`] when the deadline passes.
pub fn timeout_with_token<T, E, F>(token: &CancelToken, unit: F, duration: Duration) -> Outcome<T, E>
where
    F: CancellableUnit<T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    Spawner::default().timeout_with_token(token, unit, duration)
}

impl Spawner {
    /// See [`race_with_token`].
    pub fn race_with_token<T, E, F, I>(&self, token: &CancelToken, units: I) -> Outcome<T, E>
    where
        I: IntoIterator<Item = F>,
        F: CancellableUnit<T, E>,
        T: Send + 'static,
        E: Send + 'static,
    {
        let outcome = first::race(self, bind_all(token, units));
        if !matches!(outcome, Err(Failure::NoUnits)) && token.cancel(CancelReason::race_lost()) {
            debug!("race decided; losers signalled");
        }
        outcome
    }

    /// See [`any_with_token`].
    pub fn any_with_token<T, E, F, I>(
        &self,
        token: &CancelToken,
        units: I,
    ) -> Result<T, Vec<Failure<E>>>
    where
        I: IntoIterator<Item = F>,
        F: CancellableUnit<T, E>,
        T: Send + 'static,
        E: Send + 'static,
    {
        let result = any::first_success(self, bind_all(token, units));
        if result.is_ok() && token.cancel(CancelReason::race_lost()) {
            debug!("success observed; remaining units signalled");
        }
        result
    }

    /// See [`all_with_token`].
    pub fn all_with_token<T, E, F, I>(
        &self,
        token: &CancelToken,
        units: I,
    ) -> Result<Vec<T>, Failure<E>>
    where
        I: IntoIterator<Item = F>,
        F: CancellableUnit<T, E>,
        T: Send + 'static,
        E: Send + 'static,
    {
        let result = all::all_or_nothing(self, bind_all(token, units));
        if result.is_err() && token.cancel(CancelReason::sibling_failed()) {
            debug!("failure observed; peers signalled");
        }
        result
    }

    /// See [`timeout_with_token`].
    pub fn timeout_with_token<T, E, F>(
        &self,
        token: &CancelToken,
        unit: F,
        duration: Duration,
    ) -> Outcome<T, E>
    where
        F: CancellableUnit<T, E>,
        T: Send + 'static,
        E: Send + 'static,
    {
        let outcome = timeout::bounded(self, bind(token, unit), duration);
        if outcome.as_ref().is_err_and(Failure::is_deadline) {
            token.cancel(CancelReason::timeout());
        }
        outcome
    }
}
