//! The mutex-counter contract: a shared integer incremented by several
//! concurrent workers must end at exactly `workers * increments_per_worker`.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use log::trace;

/// A counter shared across worker threads, guarded by a mutex.
///
/// Every read-modify-write happens under the lock. Logging happens after the
/// guard is dropped, so it carries no ordering weight.
#[derive(Debug, Clone, Default)]
pub struct SharedCounter {
    inner: Arc<Mutex<u64>>,
}

impl SharedCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one and returns the value this increment produced.
    pub fn increment(&self) -> u64 {
        let mut guard = self.inner.lock().expect("counter mutex poisoned");
        *guard += 1;
        *guard
    }

    pub fn value(&self) -> u64 {
        *self.inner.lock().expect("counter mutex poisoned")
    }
}

/// Spawns `workers` threads, each incrementing a shared counter
/// `increments_per_worker` times, and returns the final value after joining
/// them all. The result equals `workers * increments_per_worker` on every
/// interleaving.
pub fn run_counter(workers: usize, increments_per_worker: usize) -> u64 {
    let counter = SharedCounter::new();
    let mut handles = Vec::with_capacity(workers);

    for worker in 1..=workers {
        let counter = counter.clone();
        handles.push(thread::spawn(move || {
            for _ in 0..increments_per_worker {
                let value = counter.increment();
                trace!("worker {} incremented counter to {}", worker, value);
                // Scheduler-visible pause so increments from different
                // workers actually interleave.
                thread::sleep(Duration::from_millis(1));
            }
        }));
    }

    for handle in handles {
        handle.join().expect("counter worker panicked");
    }

    counter.value()
}
