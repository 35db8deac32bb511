//! Ordering and isolation guarantees of `SerialQueue`.

mod common;
use common::*;

use parking_lot::Mutex;
use settle::{Failure, PushError, QueueConfig, SerialQueue};
use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

#[test]
fn concurrent_producers_keep_per_producer_fifo() {
    init_test_logging();
    test_phase!("concurrent_producers_keep_per_producer_fifo");

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let queue = Arc::new(
        SerialQueue::new(move |item: (usize, usize)| sink.lock().push(item)).unwrap(),
    );

    let producers: Vec<_> = (0..4)
        .map(|producer| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for seq in 0..25 {
                    queue.push((producer, seq)).unwrap();
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }
    let stats = Arc::try_unwrap(queue).unwrap().shutdown();
    assert_with_log!(stats.processed == 100, "each item once", 100, stats.processed);

    let seen = seen.lock().clone();
    let mut next: HashMap<usize, usize> = HashMap::new();
    let in_order = seen.iter().all(|&(producer, seq)| {
        let expected = next.entry(producer).or_insert(0);
        let ok = *expected == seq;
        *expected += 1;
        ok
    });
    assert_with_log!(in_order, "arrival order kept per producer", true, in_order);

    test_complete!("concurrent_producers_keep_per_producer_fifo");
}

#[test]
fn shared_state_needs_no_extra_locking() {
    init_test_logging();
    test_phase!("shared_state_needs_no_extra_locking");

    let overlap = Arc::new(AtomicBool::new(false));
    let busy = Arc::new(AtomicBool::new(false));
    let (overlap_flag, busy_flag) = (Arc::clone(&overlap), Arc::clone(&busy));
    let mut counter = 0_u64;
    let total = Arc::new(AtomicUsize::new(0));
    let total_sink = Arc::clone(&total);

    let queue = SerialQueue::new(move |n: u64| {
        if busy_flag.swap(true, Ordering::SeqCst) {
            overlap_flag.store(true, Ordering::SeqCst);
        }
        counter += n;
        thread::sleep(Duration::from_micros(100));
        total_sink.store(usize::try_from(counter).unwrap_or(usize::MAX), Ordering::SeqCst);
        busy_flag.store(false, Ordering::SeqCst);
    })
    .unwrap();
    for n in 1..=20 {
        queue.push(n).unwrap();
    }
    queue.shutdown();

    let overlapped = overlap.load(Ordering::SeqCst);
    assert_with_log!(!overlapped, "no overlapping handler calls", false, overlapped);
    let total = total.load(Ordering::SeqCst);
    assert_with_log!(total == 210, "every item applied", 210, total);

    test_complete!("shared_state_needs_no_extra_locking");
}

#[test]
fn faults_are_isolated_per_item() {
    init_test_logging();
    test_phase!("faults_are_isolated_per_item");

    let faults = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&faults);
    let handled = Arc::new(Mutex::new(Vec::new()));
    let handled_sink = Arc::clone(&handled);
    let queue = SerialQueue::new(move |n: u32| {
        assert!(n % 3 != 0, "multiple of three: {n}");
        handled_sink.lock().push(n);
    })
    .unwrap();
    queue.on_fault(move |failure: Failure<_>| sink.lock().push(failure.to_string()));

    for n in 1..=6 {
        queue.push(n).unwrap();
    }
    let stats = queue.shutdown();
    let handled = handled.lock().clone();
    assert_with_log!(handled == vec![1, 2, 4, 5], "survivors", vec![1, 2, 4, 5], handled);
    let faults = faults.lock().clone();
    let expected = vec![
        "recovered fault: multiple of three: 3".to_string(),
        "recovered fault: multiple of three: 6".to_string(),
    ];
    assert_with_log!(faults == expected, "faults delivered", expected, faults);
    assert_with_log!(stats.faulted == 2, "fault count", 2, stats.faulted);

    test_complete!("faults_are_isolated_per_item");
}

#[test]
fn close_drains_queued_items() {
    init_test_logging();
    test_phase!("close_drains_queued_items");

    let handled = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&handled);
    let queue = SerialQueue::new(move |()| {
        thread::sleep(Duration::from_millis(2));
        sink.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();
    for _ in 0..10 {
        queue.push(()).unwrap();
    }
    queue.close();
    let rejected = queue.push(());
    assert_with_log!(rejected == Err(PushError(())), "closed", "PushError", rejected);

    let stats = queue.shutdown();
    let handled = handled.load(Ordering::SeqCst);
    assert_with_log!(handled == 10, "queued items drained", 10, handled);
    assert_with_log!(stats.processed == 10, "stats", 10, stats.processed);

    test_complete!("close_drains_queued_items");
}

#[test]
fn until_queue_stops_itself() {
    init_test_logging();
    test_phase!("until_queue_stops_itself");

    let config = QueueConfig::new().with_thread_name("until-consumer");
    let queue = SerialQueue::until(config, |line: &'static str| {
        if line == "quit" { ControlFlow::Break(()) } else { ControlFlow::Continue(()) }
    })
    .unwrap();
    queue.push("hello").unwrap();
    queue.push("quit").unwrap();

    let stats = queue.shutdown();
    assert_with_log!(stats.processed == 2, "processed through quit", 2, stats.processed);

    test_complete!("until_queue_stops_itself");
}

#[test]
fn bounded_push_blocks_until_consumed() {
    init_test_logging();
    test_phase!("bounded_push_blocks_until_consumed");

    let release = Arc::new(AtomicBool::new(false));
    let gate = Arc::clone(&release);
    let queue = Arc::new(
        SerialQueue::with_config(QueueConfig::new().bounded(1), move |()| {
            while !gate.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(1));
            }
        })
        .unwrap(),
    );

    // One item in the handler, one in the buffer; the third push must wait.
    queue.push(()).unwrap();
    thread::sleep(Duration::from_millis(20));
    queue.push(()).unwrap();
    let pushed = Arc::new(AtomicBool::new(false));
    let pusher = {
        let queue = Arc::clone(&queue);
        let pushed = Arc::clone(&pushed);
        thread::spawn(move || {
            queue.push(()).unwrap();
            pushed.store(true, Ordering::SeqCst);
        })
    };
    thread::sleep(Duration::from_millis(30));
    let blocked = !pushed.load(Ordering::SeqCst);
    assert_with_log!(blocked, "push blocked while full", true, blocked);

    release.store(true, Ordering::SeqCst);
    pusher.join().unwrap();
    let stats = Arc::try_unwrap(queue).unwrap().shutdown();
    assert_with_log!(stats.processed == 3, "all consumed", 3, stats.processed);

    test_complete!("bounded_push_blocks_until_consumed");
}
