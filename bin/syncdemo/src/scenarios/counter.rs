use ewe_synca::{Counter, UnguardedCounter};

use super::spawn_group;
use crate::config::DemoConfig;

pub fn run(config: &DemoConfig) -> anyhow::Result<()> {
    let actors = config.actors;

    let racy = UnguardedCounter::new();
    let handle = racy.clone();
    spawn_group(actors, move |_| handle.increment()).wait();
    println!(
        "Unguarded counter: {} (expected {actors}, lost {})",
        racy.value(),
        actors as u64 - racy.value()
    );

    let guarded = Counter::new();
    let handle = guarded.clone();
    spawn_group(actors, move |_| {
        handle.increment();
    })
    .wait();
    println!("Guarded counter: {} (expected {actors})", guarded.value());

    anyhow::ensure!(
        guarded.value() == actors as u64,
        "guarded counter lost updates: {} != {actors}",
        guarded.value()
    );
    Ok(())
}
