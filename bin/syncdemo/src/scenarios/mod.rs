use std::sync::Arc;
use std::thread;

use ewe_synca::CompletionBarrier;

use crate::config::DemoConfig;
use crate::Scenario;

mod channels;
mod counter;
mod dataset;
mod ledger;
mod pool;
mod select;
mod timeout;

pub fn run(scenario: Scenario, config: &DemoConfig) -> anyhow::Result<()> {
    match scenario {
        Scenario::Counter => counter::run(config),
        Scenario::Ledger => ledger::run(config),
        Scenario::Dataset => dataset::run(config),
        Scenario::Channels => channels::run(config),
        Scenario::Select => select::run(config),
        Scenario::Pool => pool::run(config),
        Scenario::Timeout => timeout::run(config),
        Scenario::All => {
            for scenario in [
                Scenario::Counter,
                Scenario::Ledger,
                Scenario::Dataset,
                Scenario::Channels,
                Scenario::Select,
                Scenario::Pool,
                Scenario::Timeout,
            ] {
                println!("\n=== {scenario:?} ===");
                run(scenario, config)?;
            }
            Ok(())
        }
    }
}

/// Spawns `count` detached actors running `actor(index)` and returns the
/// barrier that drains once every one of them has returned or panicked.
pub(crate) fn spawn_group<F>(count: usize, actor: F) -> CompletionBarrier
where
    F: Fn(usize) + Send + Sync + 'static,
{
    let barrier = CompletionBarrier::new();
    barrier.register(count);

    let actor = Arc::new(actor);
    for index in 0..count {
        let barrier = barrier.clone();
        let actor = Arc::clone(&actor);
        thread::spawn(move || {
            let _done = barrier.defer_done();
            actor(index);
        });
    }

    barrier
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    #[ntest::timeout(5000)]
    fn spawn_group_waits_for_every_actor() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        spawn_group(50, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .wait();

        assert_eq!(hits.load(Ordering::SeqCst), 50);
    }

    #[test]
    #[ntest::timeout(5000)]
    fn spawn_group_counts_panicking_actors_as_done() {
        let barrier = spawn_group(3, |index| {
            if index == 1 {
                panic!("actor {index} failed");
            }
        });
        barrier.wait();
        assert_eq!(barrier.outstanding(), 0);
    }

    #[test]
    fn pool_scenario_rejects_zero_workers() {
        let config = DemoConfig {
            workers: 0,
            ..DemoConfig::default()
        };
        let err = pool::run(&config).unwrap_err();
        assert!(err.to_string().contains("at least one worker"));
    }

    #[test]
    #[ntest::timeout(30000)]
    fn every_scenario_runs_with_small_config() {
        let config = DemoConfig {
            actors: 20,
            jobs: 3,
            job_duration_ms: 5,
            select_timeout_ms: 300,
            slow_task_ms: 200,
            task_timeout_ms: 50,
            ..DemoConfig::default()
        };
        run(Scenario::All, &config).unwrap();
    }
}
