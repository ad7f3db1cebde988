/*!
 * Kernel Sync - Demo Entry Point
 *
 * Runs the three coordination scenarios:
 * - Two workers printing their assigned greeting
 * - A producer handing 42 to a blocked consumer
 * - Workers hammering a shared atomic counter
 */

use kernel_sync::{
    dispatch::DispatchConfig, init_tracing, AtomicAccumulator, HandoffChannel, SyncError,
    SyncResult, Task, WorkerDispatcher,
};
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;

const DEFAULT_WORKERS: u64 = 4;
const DEFAULT_INCREMENTS: u64 = 100_000;
const PRODUCER_DELAY: Duration = Duration::from_millis(200);

fn main() -> miette::Result<()> {
    init_tracing();

    let config = DispatchConfig::from_env()?;
    let dispatcher = WorkerDispatcher::new(config);
    info!(config = ?dispatcher.config(), "Kernel sync demo starting");

    spawn_greeters(&dispatcher)?;
    handoff_answer(&dispatcher)?;

    let workers = env_u64("KERNEL_SYNC_WORKERS", DEFAULT_WORKERS)?;
    let increments = env_u64("KERNEL_SYNC_INCREMENTS", DEFAULT_INCREMENTS)?;
    let total = count_in_parallel(&dispatcher, workers, increments)?;
    println!("counter={}", total);

    if total != workers * increments {
        return Err(SyncError::Internal(format!(
            "counter drifted: expected {}, got {}",
            workers * increments,
            total
        ))
        .into());
    }

    info!("Kernel sync demo finished");
    Ok(())
}

fn spawn_greeters(dispatcher: &WorkerDispatcher) -> SyncResult<()> {
    let greetings = [(1u32, "hello"), (2u32, "world")];
    let tasks = greetings
        .into_iter()
        .map(|(id, message)| {
            Task::new((id, message), |(id, message)| {
                println!("worker {}: {}", id, message);
                Ok(())
            })
            .named(format!("greeter-{}", id))
        })
        .collect();

    dispatcher.dispatch(tasks)?;
    Ok(())
}

fn handoff_answer(dispatcher: &WorkerDispatcher) -> SyncResult<()> {
    let channel = HandoffChannel::new();

    let producer = Task::from_fn(|| {
        thread::sleep(PRODUCER_DELAY);
        channel.send(42)?;
        Ok(())
    })
    .named("producer");

    let consumer = Task::from_fn(|| {
        let started = Instant::now();
        let value = channel.receive()?;
        info!(value, waited_ms = started.elapsed().as_millis() as u64, "consumer received");
        println!("consumer received: {}", value);
        Ok(())
    })
    .named("consumer");

    dispatcher.dispatch(vec![producer, consumer])?;
    Ok(())
}

fn count_in_parallel(
    dispatcher: &WorkerDispatcher,
    workers: u64,
    increments: u64,
) -> SyncResult<u64> {
    let counter = AtomicAccumulator::new(0);
    let tasks = (0..workers)
        .map(|_| {
            Task::new(increments, |increments: u64| {
                for _ in 0..increments {
                    counter.increment();
                }
                Ok(())
            })
        })
        .collect();

    dispatcher.dispatch(tasks)?;
    Ok(counter.load())
}

fn env_u64(name: &str, default: u64) -> SyncResult<u64> {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|e| {
            SyncError::Configuration(format!("{}={:?} is not a valid count: {}", name, raw, e))
        }),
        Err(_) => Ok(default),
    }
}
