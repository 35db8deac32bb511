//! Execution-context spawning.
//!
//! Every combinator spawns exactly one OS thread per work unit; threads are
//! never pooled or reused. A [`Spawner`] carries the [`SpawnConfig`] those
//! threads are built from and exposes the whole combinator family as methods.
//! The free functions in [`combinator`](crate::combinator) use
//! `Spawner::default()`.

use crate::channel::OutcomeSender;
use crate::combinator::{all, any, first, timeout};
use crate::config::{ConfigError, SpawnConfig};
use crate::tracing_compat::{trace, warn};
use crate::types::{Failure, Outcome};
use crate::unit::{WorkUnit, run_guarded};
use std::thread;
use std::time::Duration;

/// Spawns work units onto dedicated threads and joins them.
///
/// # Example
///
/// ```
/// use settle::{SpawnConfig, Spawner};
///
/// let spawner = Spawner::new(SpawnConfig::new().with_name_prefix("fetch"))?;
/// let values = spawner.wait_all((1..=2).map(|n| move || Ok::<_, ()>(n)));
/// assert_eq!(values, Ok(vec![1, 2]));
/// # Ok::<(), settle::ConfigError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Spawner {
    config: SpawnConfig,
}

impl Spawner {
    /// Creates a spawner from a validated configuration.
    pub fn new(config: SpawnConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the configuration threads are built from.
    #[must_use]
    pub const fn config(&self) -> &SpawnConfig {
        &self.config
    }

    /// Runs `unit` on its own thread and publishes its outcome under `index`.
    ///
    /// If the thread cannot be created, a [`Failure::Spawn`] is published in
    /// its place so the join still sees exactly one outcome per unit.
    pub(crate) fn spawn_unit<T, E, F>(&self, index: usize, unit: F, outcomes: &OutcomeSender<T, E>)
    where
        F: WorkUnit<T, E>,
        T: Send + 'static,
        E: Send + 'static,
    {
        let sender = outcomes.clone();
        let mut builder = thread::Builder::new().name(format!("{}-{index}", self.config.name_prefix));
        if let Some(bytes) = self.config.stack_size {
            builder = builder.stack_size(bytes);
        }

        trace!(index, "spawning execution context");
        if let Err(err) = builder.spawn(move || sender.publish(index, run_guarded(unit))) {
            warn!(index, error = %err, "failed to spawn execution context");
            outcomes.publish(index, Err(Failure::Spawn(err.to_string())));
        }
    }

    /// See [`wait`](crate::wait).
    pub fn wait<T, E, F>(&self, unit: F) -> Outcome<T, E>
    where
        F: WorkUnit<T, E>,
        T: Send + 'static,
        E: Send + 'static,
    {
        first::single(self, unit)
    }

    /// See [`wait_race`](crate::wait_race).
    pub fn wait_race<T, E, F, I>(&self, units: I) -> Outcome<T, E>
    where
        I: IntoIterator<Item = F>,
        F: WorkUnit<T, E>,
        T: Send + 'static,
        E: Send + 'static,
    {
        first::race(self, units)
    }

    /// See [`wait_any`](crate::wait_any).
    pub fn wait_any<T, E, F, I>(&self, units: I) -> Result<T, Vec<Failure<E>>>
    where
        I: IntoIterator<Item = F>,
        F: WorkUnit<T, E>,
        T: Send + 'static,
        E: Send + 'static,
    {
        any::first_success(self, units)
    }

    /// See [`wait_all`](crate::wait_all).
    pub fn wait_all<T, E, F, I>(&self, units: I) -> Result<Vec<T>, Failure<E>>
    where
        I: IntoIterator<Item = F>,
        F: WorkUnit<T, E>,
        T: Send + 'static,
        E: Send + 'static,
    {
        all::all_or_nothing(self, units)
    }

    /// See [`wait_all_settled`](crate::wait_all_settled).
    pub fn wait_all_settled<T, E, F, I>(&self, units: I) -> Vec<Outcome<T, E>>
    where
        I: IntoIterator<Item = F>,
        F: WorkUnit<T, E>,
        T: Send + 'static,
        E: Send + 'static,
    {
        all::settle_all(self, units)
    }

    /// See [`wait_timeout`](crate::wait_timeout).
    pub fn wait_timeout<T, E, F>(&self, unit: F, duration: Duration) -> Outcome<T, E>
    where
        F: WorkUnit<T, E>,
        T: Send + 'static,
        E: Send + 'static,
    {
        timeout::bounded(self, unit, duration)
    }

    /// See [`wait_after`](crate::wait_after).
    pub fn wait_after<T, E, F>(&self, unit: F, duration: Duration) -> Outcome<T, E>
    where
        F: WorkUnit<T, E>,
        T: Send + 'static,
        E: Send + 'static,
    {
        timeout::delayed(self, unit, duration)
    }
}
