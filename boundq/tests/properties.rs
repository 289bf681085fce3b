//! Queue properties checked against every backend.
//!
//! Run with tracing output:
//! ```bash
//! RUST_LOG=boundq=debug cargo test --features tracing --test properties -- --nocapture
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Once};
use std::thread;
use std::time::Duration;

use boundq::{BackendKind, Queue, QueueConfig, QueueError, Reporter, Stats, Value, Wait};

static INIT_TRACING: Once = Once::new();

fn init_test_tracing() {
    INIT_TRACING.call_once(|| {
        boundq::init_tracing();
    });
}

fn quiet_queue(kind: BackendKind, capacity: usize) -> Queue {
    init_test_tracing();
    Queue::new(QueueConfig::new(kind, capacity).with_reporter(Reporter::Silent))
        .expect("create queue")
}

/// Adds, retrying on `Full` for the fail-fast backend.
fn add_retry(queue: &Queue, value: Value) {
    loop {
        match queue.add(value) {
            Ok(()) => return,
            Err(QueueError::Full) => thread::yield_now(),
            Err(e) => panic!("add failed: {e}"),
        }
    }
}

/// Gets, retrying on `Empty` for the fail-fast backend.
fn get_retry(queue: &Queue) -> Value {
    loop {
        match queue.get() {
            Ok(value) => return value,
            Err(QueueError::Empty) => thread::yield_now(),
            Err(e) => panic!("get failed: {e}"),
        }
    }
}

#[test]
fn example_scenario() {
    for kind in BackendKind::ALL {
        let queue = quiet_queue(kind, 2);
        queue.add(5).unwrap();
        queue.add(7).unwrap();

        if kind.is_blocking() {
            let third = queue.add_with(9, &Wait::timeout(Duration::from_millis(20)));
            assert!(matches!(third, Err(QueueError::TimedOut)), "{kind}: {third:?}");
        } else {
            assert!(matches!(queue.add(9), Err(QueueError::Full)));
        }

        assert_eq!(queue.get().unwrap(), 5, "{kind}");
        assert_eq!(queue.get().unwrap(), 7, "{kind}");

        let stats = queue.destroy().unwrap();
        assert_eq!(stats.add_completed, 2, "{kind}");
        assert_eq!(stats.get_completed, 2, "{kind}");
        assert_eq!(stats.size, 0, "{kind}");
        assert_eq!(stats.add_attempts, 3, "{kind}");
    }
}

#[test]
fn interleaved_operations_keep_fifo_order() {
    for kind in BackendKind::ALL {
        let queue = quiet_queue(kind, 4);
        queue.add(1).unwrap();
        queue.add(2).unwrap();
        assert_eq!(queue.get().unwrap(), 1);
        queue.add(3).unwrap();
        queue.add(4).unwrap();
        queue.add(5).unwrap();
        assert_eq!(queue.get().unwrap(), 2);
        assert_eq!(queue.get().unwrap(), 3);
        queue.add(6).unwrap();
        for expected in 4..=6 {
            assert_eq!(queue.get().unwrap(), expected, "{kind}");
        }
        assert!(matches!(queue.try_get(), Err(QueueError::Empty)), "{kind}");
    }
}

#[test]
fn try_operations_fail_fast_on_every_backend() {
    for kind in BackendKind::ALL {
        let queue = quiet_queue(kind, 1);
        assert!(matches!(queue.try_get(), Err(QueueError::Empty)), "{kind}");
        queue.try_add(1).unwrap();
        assert!(matches!(queue.try_add(2), Err(QueueError::Full)), "{kind}");
        assert_eq!(queue.try_get().unwrap(), 1);

        let stats = queue.stats().unwrap();
        assert_eq!((stats.add_attempts, stats.add_completed), (2, 1), "{kind}");
        assert_eq!((stats.get_attempts, stats.get_completed), (2, 1), "{kind}");
    }
}

#[test]
fn single_producer_single_consumer_sees_every_value_once_in_order() {
    const N: Value = 20_000;

    for kind in BackendKind::ALL {
        let queue = quiet_queue(kind, 64);

        let received = thread::scope(|s| {
            s.spawn(|| {
                for i in 0..N {
                    add_retry(&queue, i);
                }
            });
            let consumer = s.spawn(|| (0..N).map(|_| get_retry(&queue)).collect::<Vec<_>>());
            consumer.join().unwrap()
        });

        assert_eq!(received, (0..N).collect::<Vec<_>>(), "{kind}");

        let stats = queue.destroy().unwrap();
        assert_eq!(stats.add_completed, N as u64, "{kind}");
        assert_eq!(stats.get_completed, N as u64, "{kind}");
        assert!(stats.add_attempts >= stats.add_completed, "{kind}");
        assert!(stats.get_attempts >= stats.get_completed, "{kind}");
    }
}

#[test]
fn multiple_producers_and_consumers_lose_nothing() {
    const PRODUCERS: Value = 4;
    const CONSUMERS: usize = 4;
    const PER_PRODUCER: Value = 5_000;
    const TOTAL: usize = (PRODUCERS * PER_PRODUCER) as usize;

    for kind in BackendKind::ALL {
        let queue = quiet_queue(kind, 32);
        let taken = AtomicU64::new(0);

        let streams: Vec<Vec<Value>> = thread::scope(|s| {
            for p in 0..PRODUCERS {
                let queue = &queue;
                s.spawn(move || {
                    for i in 0..PER_PRODUCER {
                        add_retry(queue, p * PER_PRODUCER + i);
                    }
                });
            }

            let consumers: Vec<_> = (0..CONSUMERS)
                .map(|_| {
                    s.spawn(|| {
                        let mut got = Vec::new();
                        while taken.fetch_add(1, Ordering::Relaxed) < TOTAL as u64 {
                            got.push(get_retry(&queue));
                        }
                        got
                    })
                })
                .collect();

            consumers.into_iter().map(|c| c.join().unwrap()).collect()
        });

        // Each consumer sees each producer's values in production order.
        for stream in &streams {
            for p in 0..PRODUCERS {
                let from_p: Vec<_> = stream
                    .iter()
                    .filter(|v| **v / PER_PRODUCER == p)
                    .collect();
                assert!(from_p.windows(2).all(|w| w[0] < w[1]), "{kind}: producer {p}");
            }
        }

        let mut all: Vec<Value> = streams.into_iter().flatten().collect();
        all.sort_unstable();
        assert_eq!(all, (0..PRODUCERS * PER_PRODUCER).collect::<Vec<_>>(), "{kind}");
        assert_eq!(queue.stats().unwrap().size, 0, "{kind}");
    }
}

#[test]
fn monitor_samples_never_break_invariants() {
    const N: Value = 20_000;
    const CAPACITY: usize = 8;

    for kind in BackendKind::ALL {
        init_test_tracing();
        let violated = Arc::new(AtomicBool::new(false));
        let samples = Arc::new(AtomicU64::new(0));

        let reporter = {
            let violated = Arc::clone(&violated);
            let samples = Arc::clone(&samples);
            Reporter::custom(move |stats: &Stats| {
                samples.fetch_add(1, Ordering::Relaxed);
                if stats.size > stats.capacity || stats.completed_diff() != stats.size as i64 {
                    violated.store(true, Ordering::Relaxed);
                }
            })
        };
        let queue = Queue::new(
            QueueConfig::new(kind, CAPACITY)
                .with_monitor_interval(Duration::from_millis(1))
                .with_reporter(reporter),
        )
        .unwrap();

        thread::scope(|s| {
            for _ in 0..2 {
                s.spawn(|| {
                    for i in 0..N / 2 {
                        add_retry(&queue, i);
                        let stats = queue.stats().unwrap();
                        assert!(stats.size <= CAPACITY);
                        assert_eq!(stats.completed_diff(), stats.size as i64);
                    }
                });
                s.spawn(|| {
                    for _ in 0..N / 2 {
                        get_retry(&queue);
                    }
                });
            }
        });

        queue.destroy().unwrap();
        assert!(samples.load(Ordering::Relaxed) > 0, "{kind}: monitor never reported");
        assert!(!violated.load(Ordering::Relaxed), "{kind}: invariant broken");
    }
}

#[test]
fn remaining_elements_are_reported_on_destroy() {
    for kind in BackendKind::ALL {
        let queue = quiet_queue(kind, 8);
        for i in 0..5 {
            queue.add(i).unwrap();
        }
        queue.get().unwrap();

        let stats = queue.destroy().unwrap();
        assert_eq!(stats.size, 4, "{kind}");
        assert_eq!(stats.to_string(), "size=4; attempts=(5,1,4); completed=(5,1,4)");
    }
}

#[test]
fn stats_serialize_with_field_names() {
    let queue = quiet_queue(BackendKind::Spin, 2);
    queue.add(1).unwrap();
    let json = serde_json::to_value(queue.stats().unwrap()).unwrap();
    assert_eq!(json["size"], 1);
    assert_eq!(json["capacity"], 2);
    assert_eq!(json["add_attempts"], 1);
    assert_eq!(json["get_completed"], 0);
}
