//! Outcome and failure types.
//!
//! Every work unit settles to an [`Outcome`]: its own value, or a [`Failure`]
//! describing why no value was produced. Failures keep the distinction
//! between an error the unit *reported* and a panic that was *recovered* at
//! the boundary of its execution context.

use core::fmt;
use std::any::Any;
use std::time::Duration;
use thiserror::Error;

/// The settled result of one work unit.
pub type Outcome<T, E> = Result<T, Failure<E>>;

/// Why a work unit (or the combinator running it) produced no value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Failure<E> {
    /// The unit returned `Err`; the error is carried verbatim.
    #[error("{0}")]
    Reported(E),
    /// The unit panicked and the panic was caught at its context boundary.
    #[error("recovered fault: {0}")]
    Fault(PanicPayload),
    /// The deadline of a bounded wait elapsed before the unit finished.
    #[error("deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),
    /// No execution context could be created for the unit.
    #[error("failed to spawn execution context: {0}")]
    Spawn(String),
    /// The combinator was given no work units to join.
    #[error("no work units supplied")]
    NoUnits,
}

impl<E> Failure<E> {
    /// Returns true if the unit itself reported this failure.
    #[must_use]
    pub const fn is_reported(&self) -> bool {
        matches!(self, Self::Reported(_))
    }

    /// Returns true if this failure is a recovered panic.
    #[must_use]
    pub const fn is_fault(&self) -> bool {
        matches!(self, Self::Fault(_))
    }

    /// Returns true if this failure was synthesized by a deadline.
    #[must_use]
    pub const fn is_deadline(&self) -> bool {
        matches!(self, Self::DeadlineExceeded(_))
    }

    /// Returns the reported error, if any.
    #[must_use]
    pub const fn reported(&self) -> Option<&E> {
        match self {
            Self::Reported(err) => Some(err),
            _ => None,
        }
    }

    /// Consumes the failure and returns the reported error, if any.
    #[must_use]
    pub fn into_reported(self) -> Option<E> {
        match self {
            Self::Reported(err) => Some(err),
            _ => None,
        }
    }

    /// Maps the reported error, leaving the other variants untouched.
    pub fn map_reported<F, O>(self, f: F) -> Failure<O>
    where
        F: FnOnce(E) -> O,
    {
        match self {
            Self::Reported(err) => Failure::Reported(f(err)),
            Self::Fault(payload) => Failure::Fault(payload),
            Self::DeadlineExceeded(after) => Failure::DeadlineExceeded(after),
            Self::Spawn(message) => Failure::Spawn(message),
            Self::NoUnits => Failure::NoUnits,
        }
    }
}

/// The message of a panic caught at a recovery boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PanicPayload {
    message: String,
}

impl PanicPayload {
    /// Placeholder used when the panic value is neither `&str` nor `String`.
    pub const OPAQUE: &'static str = "panic with a non-string payload";

    /// Creates a payload carrying the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Extracts the message from a value returned by `catch_unwind`.
    #[must_use]
    pub fn from_panic(panic: Box<dyn Any + Send>) -> Self {
        let message = match panic.downcast::<String>() {
            Ok(message) => *message,
            Err(panic) => match panic.downcast::<&'static str>() {
                Ok(message) => (*message).to_string(),
                Err(_) => Self::OPAQUE.to_string(),
            },
        };
        Self { message }
    }

    /// Returns the panic message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for PanicPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
