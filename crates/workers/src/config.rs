use std::env;
use std::str::FromStr;

/// Environment variable consulted for the default worker count.
pub const WORKER_COUNT_ENV: &str = "EWE_WORKER_COUNT";

/// Configuration for a [`crate::WorkerPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of worker threads, fixed for the pool's lifetime
    workers: usize,
    /// Pending job capacity; `None` is unbounded, zero is rendezvous
    job_capacity: Option<usize>,
    /// Pending result capacity; `None` is unbounded, zero is rendezvous
    result_capacity: Option<usize>,
}

impl PoolConfig {
    /// Creates a configuration with default values.
    ///
    /// Defaults:
    /// - `workers`: [`get_worker_count`]
    /// - `job_capacity`: unbounded
    /// - `result_capacity`: unbounded
    #[must_use]
    pub fn new() -> Self {
        Self {
            workers: get_worker_count(),
            job_capacity: None,
            result_capacity: None,
        }
    }

    #[must_use]
    pub const fn workers(mut self, count: usize) -> Self {
        self.workers = count;
        self
    }

    #[must_use]
    pub const fn job_capacity(mut self, capacity: Option<usize>) -> Self {
        self.job_capacity = capacity;
        self
    }

    /// Bounding results makes workers block once that many results are
    /// waiting unread, so something must be draining [`crate::WorkerPool::results`].
    #[must_use]
    pub const fn result_capacity(mut self, capacity: Option<usize>) -> Self {
        self.result_capacity = capacity;
        self
    }

    #[must_use]
    pub const fn get_workers(&self) -> usize {
        self.workers
    }

    #[must_use]
    pub const fn get_job_capacity(&self) -> Option<usize> {
        self.job_capacity
    }

    #[must_use]
    pub const fn get_result_capacity(&self) -> Option<usize> {
        self.result_capacity
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// [`get_worker_count`] reads the desired worker count from the
/// environment variable `EWE_WORKER_COUNT`, falling back to
/// [`std::thread::available_parallelism`].
#[must_use]
pub fn get_worker_count() -> usize {
    let count = match env::var(WORKER_COUNT_ENV)
        .ok()
        .and_then(|s| usize::from_str(s.trim()).ok())
    {
        Some(x @ 1..) => {
            tracing::debug!("Retrieved worker count from {}", WORKER_COUNT_ENV);
            x
        }
        _ => get_max_workers(),
    };

    tracing::debug!("Reporting workers available for use: {}", count);
    count
}

fn get_max_workers() -> usize {
    match std::thread::available_parallelism().ok() {
        Some(system_value) => {
            tracing::debug!("thread::available_parallelism() reported: {}", system_value);
            system_value.get()
        }
        None => 1,
    }
}

#[cfg(test)]
mod test_worker_count {
    use super::*;
    use serial_test::serial;
    use tracing_test::traced_test;

    #[test]
    #[serial]
    #[traced_test]
    fn test_worker_count_when_env_is_not_set() {
        env::remove_var(WORKER_COUNT_ENV);
        assert_eq!(get_worker_count(), get_max_workers());
        assert_ne!(get_worker_count(), 0);
    }

    #[test]
    #[serial]
    fn test_worker_count_when_env_is_set() {
        env::set_var(WORKER_COUNT_ENV, "3");
        assert_eq!(get_worker_count(), 3);
        assert_eq!(PoolConfig::new().get_workers(), 3);
        env::remove_var(WORKER_COUNT_ENV);
    }

    #[test]
    #[serial]
    fn test_worker_count_ignores_zero_and_garbage() {
        env::set_var(WORKER_COUNT_ENV, "0");
        assert_eq!(get_worker_count(), get_max_workers());

        env::set_var(WORKER_COUNT_ENV, "many");
        assert_eq!(get_worker_count(), get_max_workers());
        env::remove_var(WORKER_COUNT_ENV);
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = PoolConfig::new()
            .workers(2)
            .job_capacity(Some(5))
            .result_capacity(Some(0));

        assert_eq!(config.get_workers(), 2);
        assert_eq!(config.get_job_capacity(), Some(5));
        assert_eq!(config.get_result_capacity(), Some(0));
    }
}
