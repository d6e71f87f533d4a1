use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

/// `Counter` is a shared integer incremented under a mutex; concurrent
/// increments are never lost.
#[derive(Clone, Default, Debug)]
pub struct Counter {
    value: Arc<Mutex<u64>>,
}

impl Counter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `increment` adds one and returns the new value.
    pub fn increment(&self) -> u64 {
        let mut value = match self.value.lock() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        };
        *value += 1;
        *value
    }

    #[must_use]
    pub fn value(&self) -> u64 {
        match self.value.lock() {
            Ok(g) => *g,
            Err(e) => *e.into_inner(),
        }
    }
}

/// `UnguardedCounter` increments with a separate load and store and no lock
/// around them, so concurrent increments overwrite each other.
///
/// It exists to show lost updates next to [`Counter`]. Every access is
/// atomic, so the race is a logic race and not undefined behaviour.
#[derive(Clone, Default, Debug)]
pub struct UnguardedCounter {
    value: Arc<AtomicU64>,
}

impl UnguardedCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        let current = self.value.load(Ordering::Relaxed);
        // widen the window between read and write
        thread::yield_now();
        self.value.store(current + 1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn value(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}
