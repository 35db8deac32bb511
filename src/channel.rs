//! Outcome channels.
//!
//! Every combinator joins its execution contexts through one buffered
//! channel of [`Indexed`] outcomes. The buffer holds one slot per unit, so a
//! context never blocks when it publishes, even after the combinator has
//! returned and dropped the receiving end.

use crate::tracing_compat::trace;
use crate::types::{Failure, Outcome, PanicPayload};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// An outcome tagged with the input position of the unit that produced it.
#[derive(Debug)]
pub(crate) struct Indexed<T, E> {
    pub(crate) index: usize,
    pub(crate) outcome: Outcome<T, E>,
}

/// Result of a bounded receive.
#[derive(Debug)]
pub(crate) enum Received<T, E> {
    Outcome(Indexed<T, E>),
    TimedOut,
    Lost,
}

/// Publishing half, cloned into every execution context.
#[derive(Debug)]
pub(crate) struct OutcomeSender<T, E> {
    inner: Sender<Indexed<T, E>>,
}

impl<T, E> Clone for OutcomeSender<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T, E> OutcomeSender<T, E> {
    /// Publishes an outcome. Late outcomes are discarded once the combinator
    /// has stopped listening.
    pub(crate) fn publish(&self, index: usize, outcome: Outcome<T, E>) {
        if self.inner.send(Indexed { index, outcome }).is_err() {
            trace!(index, "combinator already returned; outcome discarded");
        }
    }
}

/// Receiving half, held by the combinator.
#[derive(Debug)]
pub(crate) struct OutcomeReceiver<T, E> {
    inner: Receiver<Indexed<T, E>>,
}

impl<T, E> OutcomeReceiver<T, E> {
    /// Blocks until the next outcome arrives.
    ///
    /// Returns `None` only if every sender is gone without publishing.
    pub(crate) fn recv(&self) -> Option<Indexed<T, E>> {
        self.inner.recv().ok()
    }

    /// Blocks until the next outcome arrives or `timeout` elapses.
    pub(crate) fn recv_timeout(&self, timeout: Duration) -> Received<T, E> {
        match self.inner.recv_timeout(timeout) {
            Ok(indexed) => Received::Outcome(indexed),
            Err(RecvTimeoutError::Timeout) => Received::TimedOut,
            Err(RecvTimeoutError::Disconnected) => Received::Lost,
        }
    }
}

/// Creates an outcome channel with room for `slots` outcomes.
pub(crate) fn outcome_channel<T, E>(slots: usize) -> (OutcomeSender<T, E>, OutcomeReceiver<T, E>) {
    let (tx, rx) = crossbeam_channel::bounded(slots);
    (OutcomeSender { inner: tx }, OutcomeReceiver { inner: rx })
}

/// Failure reported for a unit whose context vanished without publishing.
pub(crate) fn lost<E>() -> Failure<E> {
    Failure::Fault(PanicPayload::new(
        "execution context exited without reporting an outcome",
    ))
}
