//! A fixed set of worker threads draining a shared job channel.
//!
//! ```
//! use ewe_workers::{PoolConfig, WorkerPool};
//!
//! let pool = WorkerPool::new(PoolConfig::new().workers(3), |job: u32| job * 2).unwrap();
//! for job in 1..=5 {
//!     pool.submit(job).unwrap();
//! }
//! pool.close();
//!
//! let mut doubled: Vec<u32> = pool.results().into_iter().map(|r| r.value).collect();
//! doubled.sort_unstable();
//! assert_eq!(doubled, vec![2, 4, 6, 8, 10]);
//! ```

mod config;
mod pool;

pub use config::*;
pub use pool::*;
