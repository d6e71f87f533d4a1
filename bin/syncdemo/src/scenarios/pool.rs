use std::thread;

use ewe_workers::{PoolConfig, WorkerPool};

use crate::config::DemoConfig;

pub fn run(config: &DemoConfig) -> anyhow::Result<()> {
    anyhow::ensure!(config.workers > 0, "pool scenario needs at least one worker");

    let duration = config.job_duration();
    let jobs = usize::try_from(config.jobs)?;

    let pool = WorkerPool::new(
        PoolConfig::new()
            .workers(config.workers)
            .job_capacity(Some(jobs))
            .result_capacity(Some(jobs)),
        move |job: u64| {
            thread::sleep(duration);
            job * 2
        },
    )?;

    for job in 1..=config.jobs {
        pool.submit(job)?;
    }
    pool.close();

    let mut total = 0;
    for result in pool.results() {
        println!(
            "Worker {} finished job {}: {}",
            result.worker, result.job, result.value
        );
        total += result.value;
    }

    println!("Pool of {} processed {} jobs, total {total}", pool.size(), config.jobs);
    pool.join();

    let expected: u64 = (1..=config.jobs).map(|job| job * 2).sum();
    anyhow::ensure!(total == expected, "pool total {total} != {expected}");
    Ok(())
}
