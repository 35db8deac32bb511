//! Time-windowed call throttling.
//!
//! A [`Throttle`] wraps a handler and runs it at most once per window. Calls
//! inside the window get the cached outcome, failures included. While a
//! refresh is running, other callers wait on the same [`AsyncTask`] instead
//! of invoking the handler again.
//!
//! Throttles bound through a [`ThrottleRegistry`] share one cache per key, so
//! a throttle can be rebuilt in a local scope, or rebound to a new handler,
//! without losing the cached outcome.

use crate::sync::AsyncTask;
use crate::tracing_compat::{trace, warn};
use crate::types::{Failure, Outcome};
use crate::unit::run_guarded;
use core::fmt;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors raised by [`ThrottleRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThrottleError {
    /// The key was first bound with different result or error types.
    #[error("throttle key `{key}` is bound to different result types")]
    TypeMismatch {
        /// The conflicting key.
        key: String,
    },
}

type Handler<A, R, E> = Arc<dyn Fn(A) -> Result<R, E> + Send + Sync>;
type Refresh<R, E> = Arc<AsyncTask<R, Failure<E>>>;

/// When a cached outcome stops being served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expiry {
    /// Nothing cached yet.
    Stale,
    At(Instant),
    /// The window reaches past the end of the clock.
    Never,
}

impl Expiry {
    fn after(window: Duration) -> Self {
        Instant::now().checked_add(window).map_or(Self::Never, Self::At)
    }

    fn is_fresh(self) -> bool {
        match self {
            Self::Stale => false,
            Self::At(at) => at > Instant::now(),
            Self::Never => true,
        }
    }
}

struct CacheState<R, E> {
    result: Option<Outcome<R, E>>,
    expires: Expiry,
    pending: Option<Refresh<R, E>>,
}

struct ThrottleCache<R, E> {
    state: Mutex<CacheState<R, E>>,
}

impl<R: Clone, E: Clone> ThrottleCache<R, E> {
    fn new() -> Self {
        Self {
            state: Mutex::new(CacheState {
                result: None,
                expires: Expiry::Stale,
                pending: None,
            }),
        }
    }

    /// Records a finished refresh, then wakes everyone waiting on it.
    fn store(&self, refresh: &AsyncTask<R, Failure<E>>, outcome: Outcome<R, E>, window: Duration) {
        {
            let mut state = self.state.lock();
            state.result = Some(outcome.clone());
            state.expires = Expiry::after(window);
            state.pending = None;
        }
        match outcome {
            Ok(value) => refresh.resolve(value),
            Err(failure) => refresh.reject(failure),
        };
    }
}

/// A handler that runs at most once per window.
///
/// # Example
///
/// ```
/// use settle::Throttle;
/// use std::time::Duration;
///
/// let double = Throttle::new(|n: u32| Ok::<_, ()>(n * 2), Duration::from_secs(60));
/// assert_eq!(double.call(1), Ok(2));
/// // Still inside the window: the cached outcome is returned.
/// assert_eq!(double.call(2), Ok(2));
/// ```
pub struct Throttle<A, R, E> {
    handler: Handler<A, R, E>,
    cache: Arc<ThrottleCache<R, E>>,
    window: Duration,
    no_wait: bool,
}

impl<A, R, E> Throttle<A, R, E>
where
    A: Send + 'static,
    R: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Wraps `handler` with a private cache.
    pub fn new<H>(handler: H, window: Duration) -> Self
    where
        H: Fn(A) -> Result<R, E> + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
            cache: Arc::new(ThrottleCache::new()),
            window,
            no_wait: false,
        }
    }

    /// Once an outcome is cached, return it immediately even after it
    /// expires, and refresh it on a background thread.
    #[must_use]
    pub const fn with_no_wait(mut self, no_wait: bool) -> Self {
        self.no_wait = no_wait;
        self
    }

    /// Returns the length of the caching window.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Calls the handler with `arg`, or returns the cached outcome.
    ///
    /// Handler panics are recovered into [`Failure::Fault`] and cached like
    /// any other failure.
    pub fn call(&self, arg: A) -> Outcome<R, E> {
        let refresh = {
            let mut state = self.cache.state.lock();
            if let Some(result) = &state.result {
                let fresh = state.expires.is_fresh();
                if fresh || (self.no_wait && state.pending.is_some()) {
                    trace!(fresh, "throttle cache hit");
                    return result.clone();
                }
            }
            if let Some(pending) = state.pending.clone() {
                drop(state);
                trace!("waiting on in-flight throttle refresh");
                return pending.result();
            }

            let refresh: Refresh<R, E> = Arc::new(AsyncTask::new());
            state.pending = Some(Arc::clone(&refresh));
            if self.no_wait {
                if let Some(stale) = state.result.clone() {
                    drop(state);
                    self.refresh_in_background(arg, refresh);
                    return stale;
                }
            }
            refresh
        };

        trace!("throttle refreshing inline");
        let outcome = run_guarded(|| (self.handler)(arg));
        self.cache.store(&refresh, outcome.clone(), self.window);
        outcome
    }

    fn refresh_in_background(&self, arg: A, refresh: Refresh<R, E>) {
        let handler = Arc::clone(&self.handler);
        let cache = Arc::clone(&self.cache);
        let window = self.window;
        let task = Arc::clone(&refresh);
        let spawned = thread::Builder::new()
            .name("settle-throttle".to_string())
            .spawn(move || {
                let outcome = run_guarded(|| handler(arg));
                cache.store(&task, outcome, window);
            });

        if let Err(err) = spawned {
            warn!(error = %err, "failed to spawn throttle refresh");
            self.cache.state.lock().pending = None;
            refresh.reject(Failure::Spawn(err.to_string()));
        }
    }
}

impl<A, R, E> Clone for Throttle<A, R, E> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            cache: Arc::clone(&self.cache),
            window: self.window,
            no_wait: self.no_wait,
        }
    }
}

impl<A, R, E> fmt::Debug for Throttle<A, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Throttle")
            .field("window", &self.window)
            .field("no_wait", &self.no_wait)
            .finish_non_exhaustive()
    }
}

/// Keyed throttle caches.
///
/// A cache is created the first time its key is bound and lives as long as
/// the registry. Every throttle bound to the same key shares it, whatever
/// handler it wraps.
#[derive(Default)]
pub struct ThrottleRegistry {
    caches: Mutex<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl ThrottleRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `handler` to the cache for `key`.
    ///
    /// Fails with [`ThrottleError::TypeMismatch`] if `key` was first bound
    /// with different `R` or `E` types.
    pub fn throttle<A, R, E, H>(
        &self,
        key: impl Into<String>,
        handler: H,
        window: Duration,
    ) -> Result<Throttle<A, R, E>, ThrottleError>
    where
        A: Send + 'static,
        R: Clone + Send + 'static,
        E: Clone + Send + 'static,
        H: Fn(A) -> Result<R, E> + Send + Sync + 'static,
    {
        let key = key.into();
        let shared = {
            let mut caches = self.caches.lock();
            let entry = caches.entry(key.clone()).or_insert_with(|| {
                trace!("creating keyed throttle cache");
                let cache: Arc<dyn Any + Send + Sync> = Arc::new(ThrottleCache::<R, E>::new());
                cache
            });
            Arc::clone(entry)
        };
        let cache = shared
            .downcast::<ThrottleCache<R, E>>()
            .map_err(|_| ThrottleError::TypeMismatch { key })?;

        Ok(Throttle {
            handler: Arc::new(handler),
            cache,
            window,
            no_wait: false,
        })
    }

    /// Number of keys bound so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.caches.lock().len()
    }

    /// Returns true if no key has been bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.caches.lock().is_empty()
    }

    /// Returns true if `key` has a cache.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.caches.lock().contains_key(key)
    }
}

impl fmt::Debug for ThrottleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThrottleRegistry")
            .field("keys", &self.len())
            .finish()
    }
}
