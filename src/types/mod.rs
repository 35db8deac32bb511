//! Core types shared by every combinator.
//!
//! - [`outcome`]: `Outcome`, `Failure`, and the recovered `PanicPayload`
//! - [`cancel`]: Cancellation reason, kind, and the cooperative `CancelToken`

pub mod cancel;
pub mod outcome;

pub use cancel::{CancelKind, CancelReason, CancelToken};
pub use outcome::{Failure, Outcome, PanicPayload};
