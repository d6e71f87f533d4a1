use std::thread;
use std::time::{Duration, Instant};

use ewe_synca::Dataset;

use super::spawn_group;
use crate::config::DemoConfig;

const READERS: usize = 3;
const READ_HOLD: Duration = Duration::from_millis(100);
const WRITER_DELAY: Duration = Duration::from_millis(50);

pub fn run(_config: &DemoConfig) -> anyhow::Result<()> {
    let data = Dataset::new(vec![1, 2, 3, 4, 5]);
    let started = Instant::now();

    let readers = {
        let data = data.clone();
        spawn_group(READERS, move |id| {
            data.read_with(|items| {
                println!("Reader {}: {:?}", id + 1, items);
                thread::sleep(READ_HOLD);
            });
        })
    };

    let writer = {
        let data = data.clone();
        spawn_group(1, move |_| {
            thread::sleep(WRITER_DELAY);
            data.write(6);
            println!("Writer appended 6");
        })
    };

    readers.wait();
    writer.wait();

    // readers overlap, so the whole round costs about one hold, not three
    println!("Final data: {:?} after {:?}", data.read(), started.elapsed());

    let scores: Dataset<u32> = Dataset::default();
    let writers = {
        let scores = scores.clone();
        spawn_group(3, move |id| {
            let score = u32::try_from(id + 1).unwrap_or(u32::MAX) * 10;
            scores.write(score);
        })
    };
    writers.wait();

    let total: u32 = scores.read_with(|items| items.iter().sum());
    println!("Scores: {:?}, total {total}", scores.read());

    anyhow::ensure!(data.len() == 6, "writer update was lost");
    anyhow::ensure!(total == 60, "score total {total} != 60");
    Ok(())
}
