//! Single-assignment future.
//!
//! An [`AsyncTask`] starts unset and is settled at most once, by either
//! [`resolve`](AsyncTask::resolve) or [`reject`](AsyncTask::reject). Any
//! number of observers may block in [`result`](AsyncTask::result); they are
//! all woken by the settling call and all read the same cached outcome.
//!
//! The settlement check and observer registration happen under the same lock
//! the settling call takes, so an observer can never miss its wakeup.

use crate::tracing_compat::trace;
use core::fmt;
use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Observable state of an [`AsyncTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Not yet settled.
    Unset,
    /// Settled with a value.
    Resolved,
    /// Settled with a failure.
    Rejected,
}

#[derive(Debug)]
enum Slot<T, E> {
    Unset { waiting: usize },
    Resolved(T),
    Rejected(E),
}

impl<T: Clone, E: Clone> Slot<T, E> {
    fn settled(&self) -> Option<Result<T, E>> {
        match self {
            Self::Unset { .. } => None,
            Self::Resolved(value) => Some(Ok(value.clone())),
            Self::Rejected(err) => Some(Err(err.clone())),
        }
    }
}

/// A value that is produced once and read many times.
///
/// Share it between the producer and observers with an `Arc`.
///
/// # Example
///
/// ```
/// use settle::AsyncTask;
/// use std::sync::Arc;
/// use std::thread;
///
/// let task = Arc::new(AsyncTask::<u32, String>::new());
/// let producer = Arc::clone(&task);
/// thread::spawn(move || producer.resolve(42));
///
/// assert_eq!(task.result(), Ok(42));
/// // Later settlements are ignored.
/// assert!(!task.reject("too late".into()));
/// assert_eq!(task.result(), Ok(42));
/// ```
pub struct AsyncTask<T, E> {
    slot: Mutex<Slot<T, E>>,
    settled: Condvar,
}

impl<T, E> AsyncTask<T, E> {
    /// Creates an unset task.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Unset { waiting: 0 }),
            settled: Condvar::new(),
        }
    }

    /// Settles the task with `value` and wakes every observer.
    ///
    /// Returns `false`, leaving the task untouched, if it was already settled.
    pub fn resolve(&self, value: T) -> bool {
        self.settle(Slot::Resolved(value))
    }

    /// Settles the task with `err` and wakes every observer.
    ///
    /// Returns `false`, leaving the task untouched, if it was already settled.
    pub fn reject(&self, err: E) -> bool {
        self.settle(Slot::Rejected(err))
    }

    fn settle(&self, next: Slot<T, E>) -> bool {
        let mut slot = self.slot.lock();
        if !matches!(*slot, Slot::Unset { .. }) {
            trace!("task already settled; ignoring");
            return false;
        }
        *slot = next;
        drop(slot);
        self.settled.notify_all();
        true
    }

    /// Returns the current state without blocking.
    #[must_use]
    pub fn state(&self) -> TaskState {
        match *self.slot.lock() {
            Slot::Unset { .. } => TaskState::Unset,
            Slot::Resolved(_) => TaskState::Resolved,
            Slot::Rejected(_) => TaskState::Rejected,
        }
    }

    /// Returns true once the task has been resolved or rejected.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.state() != TaskState::Unset
    }

    /// Number of observers currently blocked in `result` or `result_timeout`.
    #[must_use]
    pub fn waiting(&self) -> usize {
        match *self.slot.lock() {
            Slot::Unset { waiting } => waiting,
            _ => 0,
        }
    }
}

impl<T: Clone, E: Clone> AsyncTask<T, E> {
    /// Blocks until the task is settled and returns the cached outcome.
    ///
    /// Returns immediately, and repeatably, once settled.
    pub fn result(&self) -> Result<T, E> {
        let mut slot = self.slot.lock();
        let mut registered = false;
        loop {
            match &mut *slot {
                Slot::Unset { waiting } => {
                    if !registered {
                        *waiting += 1;
                        registered = true;
                    }
                }
                settled => {
                    if let Some(outcome) = settled.settled() {
                        return outcome;
                    }
                }
            }
            self.settled.wait(&mut slot);
        }
    }

    /// Like [`result`](Self::result), but gives up after `timeout`.
    ///
    /// Returns `None` if the task is still unset when the timeout elapses.
    /// A timeout too large to be represented as a deadline waits without bound.
    pub fn result_timeout(&self, timeout: Duration) -> Option<Result<T, E>> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return Some(self.result());
        };
        let mut slot = self.slot.lock();
        if let Some(outcome) = slot.settled() {
            return Some(outcome);
        }
        if let Slot::Unset { waiting } = &mut *slot {
            *waiting += 1;
        }

        loop {
            let timed_out = self.settled.wait_until(&mut slot, deadline).timed_out();
            if let Some(outcome) = slot.settled() {
                return Some(outcome);
            }
            if timed_out {
                if let Slot::Unset { waiting } = &mut *slot {
                    *waiting -= 1;
                }
                return None;
            }
        }
    }

    /// Returns the outcome if the task is settled, without blocking.
    #[must_use]
    pub fn try_result(&self) -> Option<Result<T, E>> {
        self.slot.lock().settled()
    }
}

impl<T, E> Default for AsyncTask<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> fmt::Debug for AsyncTask<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncTask")
            .field("state", &self.state())
            .field("waiting", &self.waiting())
            .finish()
    }
}
