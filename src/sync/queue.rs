//! Serial queue: many producers, one consumer, one handler call at a time.
//!
//! A [`SerialQueue`] owns a dedicated consumer thread that takes pushed items
//! in FIFO order and runs the handler on each, strictly one after another.
//! State the handler closes over is therefore never touched concurrently.
//!
//! Handler faults are caught per item. A panic becomes [`Failure::Fault`], an
//! `Err` from a [`fallible`](SerialQueue::fallible) handler becomes
//! [`Failure::Reported`]; either is passed to the fault callback registered
//! with [`on_fault`](SerialQueue::on_fault) and the loop moves on to the next
//! item.

use crate::config::{ConfigError, QueueCapacity, QueueConfig};
use crate::tracing_compat::{debug, error, warn};
use crate::types::Failure;
use crate::unit::run_guarded;
use crossbeam_channel::{Receiver, SendError, Sender};
use parking_lot::{Mutex, RwLock};
use std::convert::Infallible;
use std::ops::ControlFlow;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use thiserror::Error;

/// Returned by [`SerialQueue::push`] once the queue is closed. Carries the
/// rejected item.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("push on a closed queue")]
pub struct PushError<T>(pub T);

impl<T> PushError<T> {
    /// Returns the item that could not be queued.
    pub fn into_inner(self) -> T {
        self.0
    }
}

/// Errors raised while creating a [`SerialQueue`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The queue configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The consumer thread could not be created.
    #[error("failed to spawn queue consumer: {0}")]
    Spawn(String),
}

/// Counters sampled from a running or finished queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Items the handler finished without a fault.
    pub processed: u64,
    /// Items whose handler panicked or returned an error.
    pub faulted: u64,
}

type FaultCallback<E> = Arc<dyn Fn(Failure<E>) + Send + Sync>;

struct Shared<E> {
    on_fault: RwLock<Option<FaultCallback<E>>>,
    closed: AtomicBool,
    processed: AtomicU64,
    faulted: AtomicU64,
}

impl<E> Shared<E> {
    fn new() -> Self {
        Self {
            on_fault: RwLock::new(None),
            closed: AtomicBool::new(false),
            processed: AtomicU64::new(0),
            faulted: AtomicU64::new(0),
        }
    }

    fn report(&self, failure: Failure<E>) {
        self.faulted.fetch_add(1, Ordering::Relaxed);
        let callback = self.on_fault.read().clone();
        let Some(callback) = callback else {
            warn!("queue handler faulted; no fault callback registered");
            return;
        };
        warn!("queue handler faulted; notifying fault callback");
        if panic::catch_unwind(AssertUnwindSafe(|| callback(failure))).is_err() {
            error!("queue fault callback panicked; continuing with the next item");
        }
    }
}

/// A FIFO work queue processed by a single consumer thread.
///
/// The error type `E` is only meaningful for [`fallible`](Self::fallible)
/// queues; the other constructors produce `SerialQueue<T>`.
///
/// # Example
///
/// ```
/// use settle::SerialQueue;
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU64, Ordering};
///
/// let total = Arc::new(AtomicU64::new(0));
/// let sink = Arc::clone(&total);
/// let queue = SerialQueue::new(move |n: u64| {
///     sink.fetch_add(n, Ordering::Relaxed);
/// })?;
///
/// for n in 1..=4 {
///     queue.push(n)?;
/// }
/// let stats = queue.shutdown();
/// assert_eq!(stats.processed, 4);
/// assert_eq!(total.load(Ordering::Relaxed), 10);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct SerialQueue<T, E = Infallible> {
    sender: Mutex<Option<Sender<T>>>,
    shared: Arc<Shared<E>>,
    consumer: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Send + 'static> SerialQueue<T> {
    /// Starts an unbounded queue with the default configuration.
    pub fn new<H>(handler: H) -> Result<Self, QueueError>
    where
        H: FnMut(T) + Send + 'static,
    {
        Self::with_config(QueueConfig::default(), handler)
    }

    /// Starts a queue with an explicit configuration.
    pub fn with_config<H>(config: QueueConfig, mut handler: H) -> Result<Self, QueueError>
    where
        H: FnMut(T) + Send + 'static,
    {
        Self::start(config, move |item| {
            handler(item);
            Ok(ControlFlow::Continue(()))
        })
    }

    /// Starts a queue whose handler can end it.
    ///
    /// Returning [`ControlFlow::Break`] closes the queue from inside the
    /// consumer loop: items still waiting are dropped and later pushes fail.
    /// A push that lands while the breaking item is being handled still
    /// returns `Ok`, and its item is dropped with the rest.
    pub fn until<H>(config: QueueConfig, mut handler: H) -> Result<Self, QueueError>
    where
        H: FnMut(T) -> ControlFlow<()> + Send + 'static,
    {
        Self::start(config, move |item| Ok(handler(item)))
    }
}

impl<T: Send + 'static, E: Send + 'static> SerialQueue<T, E> {
    /// Starts a queue whose handler reports errors.
    ///
    /// An `Err(e)` is passed to the fault callback as [`Failure::Reported`].
    pub fn fallible<H>(config: QueueConfig, mut handler: H) -> Result<Self, QueueError>
    where
        H: FnMut(T) -> Result<(), E> + Send + 'static,
    {
        Self::start(config, move |item| {
            handler(item).map(|()| ControlFlow::Continue(()))
        })
    }

    fn start<H>(config: QueueConfig, handler: H) -> Result<Self, QueueError>
    where
        H: FnMut(T) -> Result<ControlFlow<()>, E> + Send + 'static,
    {
        config.validate()?;
        let (sender, receiver) = match config.capacity {
            QueueCapacity::Unbounded => crossbeam_channel::unbounded(),
            QueueCapacity::Bounded(capacity) => crossbeam_channel::bounded(capacity),
        };
        let shared = Arc::new(Shared::new());

        let mut builder = thread::Builder::new().name(config.thread_name.clone());
        if let Some(bytes) = config.stack_size {
            builder = builder.stack_size(bytes);
        }
        let loop_shared = Arc::clone(&shared);
        let consumer = builder
            .spawn(move || consume(&receiver, &loop_shared, handler))
            .map_err(|err| QueueError::Spawn(err.to_string()))?;
        debug!(thread = %config.thread_name, "serial queue started");

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            shared,
            consumer: Mutex::new(Some(consumer)),
        })
    }

    /// Enqueues `item` for the consumer.
    ///
    /// Never runs the handler on the calling thread. Blocks while a bounded
    /// queue is full. Fails, handing the item back, once the queue is closed.
    ///
    /// `Ok` means the item was enqueued, not that it will be handled: on a
    /// queue built with [`until`](SerialQueue::until), a handler that breaks
    /// drops every item still waiting.
    pub fn push(&self, item: T) -> Result<(), PushError<T>> {
        if self.is_closed() {
            return Err(PushError(item));
        }
        // Clone out of the lock so a blocking send never holds it.
        let sender = self.sender.lock().clone();
        match sender {
            Some(sender) => sender.send(item).map_err(|SendError(item)| PushError(item)),
            None => Err(PushError(item)),
        }
    }

    /// Stops accepting items. The consumer drains what is already queued,
    /// then exits.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
        if self.sender.lock().take().is_some() {
            debug!("serial queue closed");
        }
    }

    /// Returns true once [`close`](Self::close) was called or the handler
    /// ended the queue.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Registers the callback that receives handler faults, replacing any
    /// earlier one.
    ///
    /// The callback runs on the consumer thread. A panic inside it is caught
    /// and logged.
    pub fn on_fault<C>(&self, callback: C)
    where
        C: Fn(Failure<E>) + Send + Sync + 'static,
    {
        *self.shared.on_fault.write() = Some(Arc::new(callback));
    }

    /// Samples the queue counters.
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            processed: self.shared.processed.load(Ordering::Relaxed),
            faulted: self.shared.faulted.load(Ordering::Relaxed),
        }
    }

    /// Closes the queue, waits for the consumer to drain it, and returns the
    /// final counters.
    pub fn shutdown(self) -> QueueStats {
        self.close();
        let consumer = self.consumer.lock().take();
        if let Some(consumer) = consumer {
            if consumer.join().is_err() {
                error!("serial queue consumer exited abnormally");
            }
        }
        self.stats()
    }
}

fn consume<T, E, H>(receiver: &Receiver<T>, shared: &Shared<E>, mut handler: H)
where
    H: FnMut(T) -> Result<ControlFlow<()>, E>,
{
    for item in receiver {
        match run_guarded(|| handler(item)) {
            Ok(ControlFlow::Continue(())) => {
                shared.processed.fetch_add(1, Ordering::Relaxed);
            }
            Ok(ControlFlow::Break(())) => {
                shared.processed.fetch_add(1, Ordering::Relaxed);
                shared.closed.store(true, Ordering::Release);
                debug!(dropped = receiver.len(), "handler ended the queue");
                break;
            }
            Err(failure) => shared.report(failure),
        }
    }
    debug!("serial queue consumer stopped");
}

impl<T, E> core::fmt::Debug for SerialQueue<T, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SerialQueue")
            .field("closed", &self.shared.closed.load(Ordering::Acquire))
            .field("processed", &self.shared.processed.load(Ordering::Relaxed))
            .field("faulted", &self.shared.faulted.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::{Duration, Instant};

    fn init_test(name: &str) {
        crate::test_utils::init_test_logging();
        crate::test_phase!(name);
    }

    fn wait_for(mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn items_are_handled_in_push_order() {
        init_test("items_are_handled_in_push_order");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let queue = SerialQueue::new(move |n: u32| sink.lock().push(n)).unwrap();
        for n in 0..50 {
            queue.push(n).unwrap();
        }
        let stats = queue.shutdown();
        let seen = seen.lock().clone();
        let expected: Vec<u32> = (0..50).collect();
        crate::assert_with_log!(seen == expected, "fifo", expected, seen);
        crate::assert_with_log!(stats.processed == 50, "processed", 50, stats.processed);
        crate::test_complete!("items_are_handled_in_push_order");
    }

    #[test]
    fn handler_never_runs_concurrently() {
        init_test("handler_never_runs_concurrently");
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (a, p) = (Arc::clone(&active), Arc::clone(&peak));
        let queue = Arc::new(
            SerialQueue::new(move |()| {
                let now = a.fetch_add(1, Ordering::SeqCst) + 1;
                p.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_micros(200));
                a.fetch_sub(1, Ordering::SeqCst);
            })
            .unwrap(),
        );

        let producers: Vec<_> = (0..4)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for _ in 0..10 {
                        queue.push(()).unwrap();
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }
        let queue = Arc::try_unwrap(queue).unwrap();
        let stats = queue.shutdown();
        let peak = peak.load(Ordering::SeqCst);
        crate::assert_with_log!(peak == 1, "one handler at a time", 1, peak);
        crate::assert_with_log!(stats.processed == 40, "all processed", 40, stats.processed);
        crate::test_complete!("handler_never_runs_concurrently");
    }

    #[test]
    fn panics_reach_fault_callback_and_loop_continues() {
        init_test("panics_reach_fault_callback_and_loop_continues");
        let faults = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&faults);
        let queue = SerialQueue::new(|n: u8| {
            assert!(n != 2, "item {n} rejected");
        })
        .unwrap();
        queue.on_fault(move |failure| sink.lock().push(failure));
        for n in 1..=3 {
            queue.push(n).unwrap();
        }
        let stats = queue.shutdown();
        crate::assert_with_log!(
            stats == QueueStats { processed: 2, faulted: 1 },
            "stats",
            "processed 2, faulted 1",
            stats
        );
        let faults = faults.lock().clone();
        let recovered = matches!(
            faults.as_slice(),
            [Failure::Fault(payload)] if payload.message() == "item 2 rejected"
        );
        crate::assert_with_log!(recovered, "fault delivered", "Fault(item 2 rejected)", faults);
        crate::test_complete!("panics_reach_fault_callback_and_loop_continues");
    }

    #[test]
    fn fallible_errors_are_reported() {
        init_test("fallible_errors_are_reported");
        let faults = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&faults);
        let queue = SerialQueue::fallible(QueueConfig::new(), |n: i32| {
            if n < 0 { Err(format!("negative: {n}")) } else { Ok(()) }
        })
        .unwrap();
        queue.on_fault(move |failure| sink.lock().push(failure));
        for n in [1, -1, 2, -2] {
            queue.push(n).unwrap();
        }
        let stats = queue.shutdown();
        let faults = faults.lock().clone();
        let expected = vec![
            Failure::Reported("negative: -1".to_string()),
            Failure::Reported("negative: -2".to_string()),
        ];
        crate::assert_with_log!(faults == expected, "reported errors", expected, faults);
        crate::assert_with_log!(stats.faulted == 2, "faulted", 2, stats.faulted);
        crate::test_complete!("fallible_errors_are_reported");
    }

    #[test]
    fn panicking_fault_callback_does_not_stop_the_loop() {
        init_test("panicking_fault_callback_does_not_stop_the_loop");
        let queue = SerialQueue::new(|fail: bool| assert!(!fail, "handler fault")).unwrap();
        queue.on_fault(|_| panic!("callback fault"));
        for fail in [true, false, true, false] {
            queue.push(fail).unwrap();
        }
        let stats = queue.shutdown();
        crate::assert_with_log!(
            stats == QueueStats { processed: 2, faulted: 2 },
            "loop survived",
            "processed 2, faulted 2",
            stats
        );
        crate::test_complete!("panicking_fault_callback_does_not_stop_the_loop");
    }

    #[test]
    fn break_closes_the_queue() {
        init_test("break_closes_the_queue");
        let queue = SerialQueue::until(QueueConfig::new(), |n: u8| {
            if n == 3 { ControlFlow::Break(()) } else { ControlFlow::Continue(()) }
        })
        .unwrap();
        for n in 1..=3 {
            queue.push(n).unwrap();
        }
        wait_for(|| queue.is_closed());
        let rejected = queue.push(4);
        crate::assert_with_log!(
            rejected == Err(PushError(4)),
            "push after break",
            "Err(PushError(4))",
            rejected
        );
        let stats = queue.shutdown();
        crate::assert_with_log!(stats.processed == 3, "processed", 3, stats.processed);
        crate::test_complete!("break_closes_the_queue");
    }

    #[test]
    fn push_after_close_returns_item() {
        init_test("push_after_close_returns_item");
        let queue = SerialQueue::new(|_: String| {}).unwrap();
        queue.close();
        let rejected = queue.push("late".to_string()).map_err(PushError::into_inner);
        crate::assert_with_log!(
            rejected == Err("late".to_string()),
            "item handed back",
            "Err(late)",
            rejected
        );
        crate::test_complete!("push_after_close_returns_item");
    }

    #[test]
    fn rendezvous_queue_delivers_everything() {
        init_test("rendezvous_queue_delivers_everything");
        let count = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&count);
        let config = QueueConfig::new().bounded(0).with_thread_name("rendezvous");
        let queue = SerialQueue::with_config(config, move |()| {
            thread::sleep(Duration::from_millis(1));
            sink.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        for _ in 0..5 {
            queue.push(()).unwrap();
        }
        queue.shutdown();
        let count = count.load(Ordering::SeqCst);
        crate::assert_with_log!(count == 5, "all delivered", 5, count);
        crate::test_complete!("rendezvous_queue_delivers_everything");
    }

    #[test]
    fn invalid_config_is_rejected() {
        init_test("invalid_config_is_rejected");
        let result = SerialQueue::with_config(QueueConfig::new().with_stack_size(0), |(): ()| {});
        let rejected = matches!(result, Err(QueueError::Config(_)));
        crate::assert_with_log!(rejected, "config error", true, rejected);
        crate::test_complete!("invalid_config_is_rejected");
    }

    #[test]
    fn items_enqueued_before_break_are_dropped() {
        init_test("items_enqueued_before_break_are_dropped");
        let (gate_tx, gate_rx) = crossbeam_channel::bounded::<()>(0);
        let handled = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&handled);
        let queue = SerialQueue::until(QueueConfig::new(), move |n: u8| {
            seen.lock().push(n);
            let _ = gate_rx.recv();
            ControlFlow::Break(())
        })
        .unwrap();

        queue.push(1).unwrap();
        wait_for(|| handled.lock().len() == 1);
        let accepted: Vec<_> = (2..=4).map(|n| queue.push(n)).collect();
        let all_ok = accepted.iter().all(Result::is_ok);
        crate::assert_with_log!(all_ok, "pushes accepted while handling", true, accepted);
        gate_tx.send(()).unwrap();

        let stats = queue.shutdown();
        let handled = handled.lock().clone();
        crate::assert_with_log!(handled == vec![1], "only the breaking item ran", "[1]", handled);
        crate::assert_with_log!(stats.processed == 1, "processed", 1, stats.processed);
        crate::test_complete!("items_enqueued_before_break_are_dropped");
    }
}
