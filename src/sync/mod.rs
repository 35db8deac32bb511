//! Synchronization primitives built on OS threads.
//!
//! - [`task`]: `AsyncTask`, a single-assignment future
//! - [`queue`]: `SerialQueue`, a single-consumer FIFO with fault isolation

pub mod queue;
pub mod task;

pub use queue::{PushError, QueueError, QueueStats, SerialQueue};
pub use task::{AsyncTask, TaskState};
