use std::thread;

use ewe_channels::{bounded, ChannelError};

use crate::config::DemoConfig;

pub fn run(config: &DemoConfig) -> anyhow::Result<()> {
    // capacity 1 lets the abandoned task finish its send and exit
    let (tx, rx) = bounded::<bool>(1);
    let slow = config.slow_task();

    thread::spawn(move || {
        thread::sleep(slow);
        let _ = tx.send(true);
    });

    match rx.receive_timeout(config.task_timeout()) {
        Ok(_) => println!("Task completed"),
        Err(ChannelError::Timeout) => println!("Task timed out!"),
        Err(err) => return Err(err.into()),
    }
    Ok(())
}
