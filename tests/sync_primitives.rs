/*!
 * Synchronization Primitives Integration Tests
 *
 * Handoff channel and atomic accumulator under real thread contention
 */

use kernel_sync::{AtomicAccumulator, HandoffChannel, HandoffError, HandoffState};
use proptest::prelude::*;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_receive_blocks_until_send() {
    let channel = Arc::new(HandoffChannel::new());
    let producer = channel.clone();

    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        producer.send(42)
    });

    let start = Instant::now();
    let value = channel.receive();
    let waited = start.elapsed();

    assert_eq!(value, Ok(42));
    // Consumer must have been parked until the producer woke up
    assert!(waited >= Duration::from_millis(150));
    assert!(handle.join().unwrap().is_ok());
}

#[test]
fn test_wait_then_notify_is_race_free() {
    // Consumer registers first, producer fires immediately: repeated to shake
    // out lost wakeups
    for round in 0..200u32 {
        let channel = Arc::new(HandoffChannel::new());
        let consumer = channel.clone();

        let handle = thread::spawn(move || consumer.receive());
        channel.send(round).unwrap();

        assert_eq!(handle.join().unwrap(), Ok(round));
    }
}

#[test]
fn test_send_before_receive() {
    let channel = HandoffChannel::new();
    channel.send(vec![1u8, 2, 3]).unwrap();

    let data = thread::scope(|s| s.spawn(|| channel.receive()).join().unwrap());
    assert_eq!(data, Ok(vec![1, 2, 3]));
}

#[test]
fn test_double_send_rejected_and_original_kept() {
    let channel = HandoffChannel::new();
    channel.send("first").unwrap();

    assert_eq!(channel.send("second"), Err(HandoffError::AlreadyFilled));
    assert_eq!(channel.state(), HandoffState::Filled);
    assert_eq!(channel.receive(), Ok("first"));
}

#[test]
fn test_value_delivered_to_exactly_one_of_many() {
    let channel = Arc::new(HandoffChannel::new());
    let received = Arc::new(AtomicAccumulator::new(0));
    let consumed = Arc::new(AtomicAccumulator::new(0));

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let channel = channel.clone();
            let received = received.clone();
            let consumed = consumed.clone();
            thread::spawn(move || match channel.receive() {
                Ok(v) => {
                    assert_eq!(v, 1234);
                    received.increment();
                }
                Err(HandoffError::AlreadyConsumed) => consumed.increment(),
                Err(other) => panic!("unexpected outcome: {other}"),
            })
        })
        .collect();

    // Give threads time to park
    thread::sleep(Duration::from_millis(100));
    channel.send(1234).unwrap();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(received.load(), 1);
    assert_eq!(consumed.load(), 4);
    assert_eq!(channel.waiter_count(), 0);
}

#[test]
fn test_timeout_then_late_value() {
    let channel = HandoffChannel::new();

    let start = Instant::now();
    assert_eq!(
        channel.receive_timeout(Duration::from_millis(50)),
        Err(HandoffError::Timeout)
    );
    assert!(start.elapsed() >= Duration::from_millis(50));

    // A timed-out wait leaves the slot usable
    assert_eq!(channel.state(), HandoffState::Empty);
    channel.send(3).unwrap();
    assert_eq!(channel.receive_timeout(Duration::from_millis(50)), Ok(3));
}

#[test]
fn test_reset_cycles() {
    let channel = Arc::new(HandoffChannel::new());

    for round in 0..5u64 {
        let producer = channel.clone();
        let handle = thread::spawn(move || producer.send(round * 10));

        assert_eq!(channel.receive(), Ok(round * 10));
        handle.join().unwrap().unwrap();
        channel.reset().unwrap();
    }

    assert_eq!(channel.state(), HandoffState::Empty);
}

#[test]
fn test_retired_channel_fails_fast() {
    let channel = HandoffChannel::new();
    channel.send(1).unwrap();
    channel.receive().unwrap();

    assert_eq!(channel.send(2), Err(HandoffError::AlreadyConsumed));
    assert_eq!(channel.receive(), Err(HandoffError::AlreadyConsumed));
    assert_eq!(channel.try_receive(), Err(HandoffError::AlreadyConsumed));
}

#[test]
fn test_accumulator_four_by_hundred_thousand() {
    for _ in 0..5 {
        let counter = Arc::new(AtomicAccumulator::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counter = counter.clone();
                thread::spawn(move || {
                    for _ in 0..100_000 {
                        counter.increment();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counter.load(), 400_000);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_accumulator_counts_every_increment(workers in 1usize..8, per_worker in 0u64..2_000, start in 0u64..1_000) {
        let counter = AtomicAccumulator::new(start);

        thread::scope(|s| {
            for _ in 0..workers {
                s.spawn(|| {
                    for _ in 0..per_worker {
                        counter.increment();
                    }
                });
            }
        });

        prop_assert_eq!(counter.load(), start + workers as u64 * per_worker);
    }

    #[test]
    fn prop_handoff_delivers_sent_value(value in any::<i64>()) {
        let channel = HandoffChannel::new();

        let received = thread::scope(|s| {
            let consumer = s.spawn(|| channel.receive());
            channel.send(value).unwrap();
            consumer.join().unwrap()
        });

        prop_assert_eq!(received, Ok(value));
    }
}
