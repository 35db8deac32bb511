//! Optional tracing integration.
//!
//! With the `tracing-integration` feature enabled this module re-exports the
//! `tracing` event macros. Without it, the same names resolve to macros that
//! expand to nothing, so instrumented call sites compile to no-ops.
//!
//! ```ignore
//! use crate::tracing_compat::debug;
//!
//! debug!(units = 3, "join started");
//! ```

#[cfg(feature = "tracing-integration")]
pub use tracing::{debug, error, info, trace, warn};

#[cfg(not(feature = "tracing-integration"))]
#[doc(hidden)]
#[macro_export]
macro_rules! __settle_disabled_event {
    ($($arg:tt)*) => {{}};
}

#[cfg(not(feature = "tracing-integration"))]
pub use crate::__settle_disabled_event as debug;
#[cfg(not(feature = "tracing-integration"))]
pub use crate::__settle_disabled_event as error;
#[cfg(not(feature = "tracing-integration"))]
pub use crate::__settle_disabled_event as info;
#[cfg(not(feature = "tracing-integration"))]
pub use crate::__settle_disabled_event as trace;
#[cfg(not(feature = "tracing-integration"))]
pub use crate::__settle_disabled_event as warn;
