//! Counted join primitive for a group of concurrently running actors.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::RunOnDrop;

/// `CompletionBarrier` lets an orchestrator block until every registered
/// actor reported done.
///
/// Register before spawning, have each actor call [`CompletionBarrier::done`]
/// exactly once (usually through [`CompletionBarrier::defer_done`]), then
/// [`CompletionBarrier::wait`].
///
/// # Examples
///
/// ```
/// use ewe_synca::CompletionBarrier;
/// use std::thread;
///
/// let barrier = CompletionBarrier::new();
/// barrier.register(3);
///
/// for id in 0..3 {
///     let barrier = barrier.clone();
///     thread::spawn(move || {
///         let _done = barrier.defer_done();
///         println!("worker {id} finished");
///     });
/// }
///
/// barrier.wait();
/// assert_eq!(barrier.outstanding(), 0);
/// ```
#[derive(Clone, Default)]
pub struct CompletionBarrier {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    outstanding: Mutex<usize>,
    drained: Condvar,
}

impl std::fmt::Debug for CompletionBarrier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionBarrier")
            .field("outstanding", &self.outstanding())
            .finish()
    }
}

impl CompletionBarrier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `register` adds `n` outstanding actors.
    pub fn register(&self, n: usize) {
        let mut count = self.lock();
        *count += n;
        tracing::debug!("CompletionBarrier registered {} actors, {} outstanding", n, *count);
    }

    /// `done` marks one actor as finished.
    ///
    /// # Panics
    ///
    /// Calling `done` more times than were registered is a programming error
    /// and panics.
    pub fn done(&self) {
        let mut count = self.lock();
        if *count == 0 {
            drop(count);
            panic!("CompletionBarrier::done called more times than registered");
        }

        *count -= 1;
        if *count == 0 {
            drop(count);
            self.inner.drained.notify_all();
        }
    }

    /// `defer_done` returns a guard that calls [`CompletionBarrier::done`]
    /// when dropped, including while unwinding from a panic.
    pub fn defer_done(&self) -> RunOnDrop<impl FnOnce() + Send> {
        let barrier = self.clone();
        RunOnDrop::new(move || barrier.done())
    }

    /// `wait` blocks until the outstanding count reaches zero.
    pub fn wait(&self) {
        let count = self.lock();
        let guard = match self.inner.drained.wait_while(count, |c| *c > 0) {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        };
        drop(guard);
    }

    /// `wait_timeout` returns true if the count reached zero within `dur`.
    #[must_use]
    pub fn wait_timeout(&self, dur: Duration) -> bool {
        let count = self.lock();
        let (guard, _) = match self.inner.drained.wait_timeout_while(count, dur, |c| *c > 0) {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        };
        *guard == 0
    }

    #[must_use]
    pub fn outstanding(&self) -> usize {
        *self.lock()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, usize> {
        match self.inner.outstanding.lock() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        }
    }
}
