use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::atomic::AtomicCell;
use ewe_channels::{create, ChannelError, ReceiveChannel, SendChannel, SendOnly, SendOnlyChannel};
use ewe_synca::{CompletionBarrier, RunOnDrop};
use thiserror::Error;

use crate::PoolConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub usize);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A job as it travels through the job channel. Exactly one worker claims it.
#[derive(Debug)]
pub struct Job<J> {
    pub id: JobId,
    pub payload: J,
}

/// The outcome of one job, published by the worker that ran it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult<R> {
    pub job: JobId,
    pub worker: WorkerId,
    pub value: R,
}

/// Lifecycle of a single worker: `Idle` -> `Busy` -> `Idle` ... -> `Exited`
/// once the job channel is closed and drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Busy,
    Exited,
}

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] io::Error),

    #[error("job channel has no workers left to receive from it")]
    NoWorkers,

    #[error("job channel is at capacity")]
    QueueFull,
}

pub type PoolResult<T> = std::result::Result<T, PoolError>;

struct Worker {
    id: WorkerId,
    state: Arc<AtomicCell<WorkerState>>,
    thread: Option<JoinHandle<()>>,
}

/// `WorkerPool` runs a fixed number of workers that pull jobs from a shared
/// channel and publish results to another.
///
/// Results arrive in completion order: nothing is guaranteed about ordering
/// across workers. The result sequence ends once [`WorkerPool::close`] was
/// called, every job was processed and every worker exited.
///
/// Dropping or [`WorkerPool::join`]ing the pool closes the job channel and
/// waits for the workers, so with a bounded result channel something must
/// still be draining [`WorkerPool::results`].
pub struct WorkerPool<J, R> {
    jobs: SendChannel<Job<J>>,
    results: ReceiveChannel<JobResult<R>>,
    workers: Vec<Worker>,
    closer: Option<JoinHandle<()>>,
    barrier: CompletionBarrier,
    next_job: AtomicU64,
    panicked: Arc<AtomicUsize>,
}

impl<J, R> WorkerPool<J, R>
where
    J: Send + 'static,
    R: Send + 'static,
{
    /// Starts `config.get_workers()` workers, each applying `handler` to the
    /// jobs it claims.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Spawn`] if a worker thread could not be started.
    ///
    /// # Panics
    ///
    /// Panics if the configured worker count is 0.
    pub fn new<F>(config: PoolConfig, handler: F) -> PoolResult<Self>
    where
        F: Fn(J) -> R + Send + Sync + 'static,
    {
        let size = config.get_workers();
        assert!(size > 0, "WorkerPool size must be > 0");

        let (jobs, job_receiver) = create::<Job<J>>(config.get_job_capacity());
        let (result_sender, results) = create::<JobResult<R>>(config.get_result_capacity());

        let handler = Arc::new(handler);
        let barrier = CompletionBarrier::new();
        let panicked = Arc::new(AtomicUsize::new(0));

        barrier.register(size);

        let mut workers = Vec::with_capacity(size);
        for index in 0..size {
            let worker = Worker::spawn(
                WorkerId(index + 1),
                job_receiver.clone(),
                result_sender.clone().send_only(),
                Arc::clone(&handler),
                barrier.clone(),
                Arc::clone(&panicked),
            )?;
            workers.push(worker);
        }

        // the result channel has exactly one closer: it fires once every
        // worker reported done
        let closer = {
            let barrier = barrier.clone();
            thread::Builder::new()
                .name(String::from("ewe-worker-closer"))
                .spawn(move || {
                    barrier.wait();
                    result_sender.close();
                    tracing::debug!("All workers exited, result channel closed");
                })?
        };

        tracing::info!("WorkerPool started with {} workers", size);

        Ok(Self {
            jobs,
            results,
            workers,
            closer: Some(closer),
            barrier,
            next_job: AtomicU64::new(1),
            panicked,
        })
    }

    /// `submit` enqueues `payload`, blocking while a bounded job channel is
    /// full, and returns the id assigned to the job.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::NoWorkers`] if no worker is left to take jobs.
    ///
    /// # Panics
    ///
    /// Submitting after [`WorkerPool::close`] is a programming error and panics,
    /// including a submit still waiting for room in a bounded job channel when
    /// the pool closes. Such a job is never queued.
    pub fn submit(&self, payload: J) -> PoolResult<JobId> {
        self.ensure_open();
        let id = self.allocate_id();
        match self.jobs.send(Job { id, payload }) {
            Ok(()) => Ok(id),
            Err(_) => Err(PoolError::NoWorkers),
        }
    }

    /// # Errors
    ///
    /// Returns [`PoolError::QueueFull`] when a bounded job channel has no room.
    ///
    /// # Panics
    ///
    /// Panics if the pool was already closed.
    pub fn try_submit(&self, payload: J) -> PoolResult<JobId> {
        self.ensure_open();
        let id = self.allocate_id();
        match self.jobs.try_send(Job { id, payload }) {
            Ok(()) => Ok(id),
            Err(ChannelError::Full) => Err(PoolError::QueueFull),
            Err(_) => Err(PoolError::NoWorkers),
        }
    }

    fn allocate_id(&self) -> JobId {
        JobId(self.next_job.fetch_add(1, Ordering::Relaxed))
    }

    fn ensure_open(&self) {
        if self.jobs.is_closed() {
            panic!("submit on closed worker pool");
        }
    }
}

impl<J, R> WorkerPool<J, R> {
    /// `close` signals that no more jobs will be submitted. Workers finish
    /// what is queued and then exit.
    ///
    /// # Panics
    ///
    /// Closing twice panics.
    pub fn close(&self) {
        self.jobs.close();
        tracing::debug!("WorkerPool job channel closed");
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.jobs.is_closed()
    }

    /// `results` returns a receiver over results in completion order. It
    /// yields `None` (ending iteration) once the pool is closed and every
    /// worker has exited.
    #[must_use]
    pub fn results(&self) -> ReceiveChannel<JobResult<R>> {
        self.results.clone()
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Number of workers that have not exited yet.
    #[must_use]
    pub fn active_workers(&self) -> usize {
        self.barrier.outstanding()
    }

    #[must_use]
    pub fn worker_states(&self) -> Vec<(WorkerId, WorkerState)> {
        self.workers.iter().map(|w| (w.id, w.state.load())).collect()
    }

    /// Number of jobs whose handler panicked. Such jobs produce no result.
    #[must_use]
    pub fn panicked(&self) -> usize {
        self.panicked.load(Ordering::Acquire)
    }

    /// `join` closes the pool if needed and waits for every worker to exit.
    pub fn join(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if !self.jobs.is_closed() {
            self.close();
        }

        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                if thread.join().is_err() {
                    tracing::error!("Worker {} thread panicked", worker.id);
                }
            }
        }

        if let Some(closer) = self.closer.take() {
            if closer.join().is_err() {
                tracing::error!("WorkerPool result closer panicked");
            }
        }
    }
}

impl<J, R> Drop for WorkerPool<J, R> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Worker {
    fn spawn<J, R, F>(
        id: WorkerId,
        jobs: ReceiveChannel<Job<J>>,
        results: SendOnly<JobResult<R>>,
        handler: Arc<F>,
        barrier: CompletionBarrier,
        panicked: Arc<AtomicUsize>,
    ) -> io::Result<Self>
    where
        J: Send + 'static,
        R: Send + 'static,
        F: Fn(J) -> R + Send + Sync + 'static,
    {
        let state = Arc::new(AtomicCell::new(WorkerState::Idle));
        let worker_state = Arc::clone(&state);

        let thread = thread::Builder::new()
            .name(format!("ewe-worker-{id}"))
            .spawn(move || {
                let _done = barrier.defer_done();
                let _exited = RunOnDrop::new(|| worker_state.store(WorkerState::Exited));

                for job in &jobs {
                    worker_state.store(WorkerState::Busy);
                    tracing::debug!("Worker {} processing job {}", id, job.id);

                    let Job { id: job_id, payload } = job;
                    match panic::catch_unwind(AssertUnwindSafe(|| (*handler)(payload))) {
                        Ok(value) => {
                            let result = JobResult {
                                job: job_id,
                                worker: id,
                                value,
                            };
                            if results.send(result).is_ok() {
                                tracing::debug!("Worker {} published result of job {}", id, job_id);
                            } else {
                                tracing::warn!(
                                    "Worker {} dropped result of job {}: nobody is receiving",
                                    id,
                                    job_id
                                );
                            }
                        }
                        Err(_) => {
                            panicked.fetch_add(1, Ordering::AcqRel);
                            tracing::error!("Worker {} job {} panicked", id, job_id);
                        }
                    }

                    worker_state.store(WorkerState::Idle);
                }

                tracing::info!("Worker {} exiting, job channel closed and drained", id);
            })?;

        Ok(Self {
            id,
            state,
            thread: Some(thread),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::Duration;

    #[test]
    #[ntest::timeout(5000)]
    fn every_job_is_processed_exactly_once() {
        let pool = WorkerPool::new(PoolConfig::new().workers(3), |job: u64| job * 2)
            .expect("pool should start");

        let mut submitted = HashSet::new();
        for job in 1..=5 {
            submitted.insert(pool.submit(job).expect("should submit"));
        }
        pool.close();

        let results: Vec<JobResult<u64>> = pool.results().into_iter().collect();
        let seen: HashSet<JobId> = results.iter().map(|r| r.job).collect();

        assert_eq!(results.len(), 5);
        assert_eq!(seen, submitted);
        for result in &results {
            assert_eq!(result.value, result.job.0 * 2);
        }
    }

    #[test]
    #[ntest::timeout(5000)]
    fn workers_all_exit_after_results_are_exhausted() {
        let pool = WorkerPool::new(PoolConfig::new().workers(3), |job: u32| job)
            .expect("pool should start");
        for job in 0..10 {
            pool.submit(job).expect("should submit");
        }
        pool.close();

        let count = pool.results().iter().count();
        assert_eq!(count, 10);
        assert_eq!(pool.active_workers(), 0);

        pool.join();
    }

    #[test]
    #[should_panic(expected = "submit on closed worker pool")]
    fn submit_after_close_panics() {
        let pool = WorkerPool::new(PoolConfig::new().workers(1), |job: u32| job)
            .expect("pool should start");
        pool.close();
        let _ = pool.submit(1);
    }

    #[test]
    #[should_panic(expected = "WorkerPool size must be > 0")]
    fn zero_workers_panics() {
        let _ = WorkerPool::new(PoolConfig::new().workers(0), |job: u32| job);
    }

    #[test]
    #[ntest::timeout(5000)]
    fn try_submit_reports_full_job_channel() {
        let (gate_tx, gate) = ewe_channels::rendezvous::<()>();
        let pool = WorkerPool::new(
            PoolConfig::new().workers(1).job_capacity(Some(1)),
            move |job: u32| {
                let _ = gate.receive();
                job
            },
        )
        .expect("pool should start");

        pool.submit(1).expect("worker claims it");
        // wait for the worker to claim job 1 and block on the gate
        while pool.worker_states()[0].1 != WorkerState::Busy {
            thread::sleep(Duration::from_millis(1));
        }
        pool.submit(2).expect("fits in the channel");
        assert!(matches!(pool.try_submit(3), Err(PoolError::QueueFull)));

        gate_tx.close();
        pool.close();
        assert_eq!(pool.results().iter().count(), 2);
    }

    #[test]
    #[ntest::timeout(5000)]
    fn submit_blocked_on_full_queue_panics_when_pool_closes() {
        let (gate_tx, gate) = ewe_channels::unbounded::<()>();
        let pool = WorkerPool::new(
            PoolConfig::new().workers(1).job_capacity(Some(1)),
            move |job: u32| {
                let _ = gate.receive();
                job
            },
        )
        .expect("pool should start");

        pool.submit(1).expect("worker claims it");
        while pool.worker_states()[0].1 != WorkerState::Busy {
            thread::sleep(Duration::from_millis(1));
        }
        pool.submit(2).expect("fits in the channel");

        thread::scope(|scope| {
            let blocked = scope.spawn(|| pool.submit(3));
            thread::sleep(Duration::from_millis(50));
            pool.close();
            assert!(blocked.join().is_err(), "job 3 was accepted after close");
        });

        gate_tx.close();
        let mut values: Vec<u32> = pool.results().iter().map(|r| r.value).collect();
        values.sort_unstable();

        assert_eq!(values, vec![1, 2]);
    }

    #[test]
    #[ntest::timeout(5000)]
    fn panicking_job_does_not_take_down_worker() {
        let pool = WorkerPool::new(PoolConfig::new().workers(1), |job: u32| {
            assert!(job != 2, "job 2 is poisoned");
            job
        })
        .expect("pool should start");

        for job in 1..=3 {
            pool.submit(job).expect("should submit");
        }
        pool.close();

        let mut values: Vec<u32> = pool.results().iter().map(|r| r.value).collect();
        values.sort_unstable();

        assert_eq!(values, vec![1, 3]);
        assert_eq!(pool.panicked(), 1);
    }
}
