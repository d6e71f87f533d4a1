use std::thread;
use std::time::Duration;

use ewe_channels::{bounded, Multiplexer, Selected};

use crate::config::DemoConfig;

pub fn run(config: &DemoConfig) -> anyhow::Result<()> {
    let (first_tx, first) = bounded::<String>(1);
    let (second_tx, second) = bounded::<String>(1);

    thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        let _ = first_tx.send(String::from("Message from first"));
    });
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        let _ = second_tx.send(String::from("Message from second"));
    });

    let mut mux = Multiplexer::new()
        .with_source(&first)
        .with_source(&second)
        .timeout(config.select_timeout());

    let mut received = 0;
    for _ in 0..2 {
        match mux.wait() {
            Selected::Received { index, value } => {
                received += 1;
                println!("Source {index}: {value}");
            }
            Selected::Closed { index } => println!("Source {index} closed"),
            Selected::Timeout => println!("Timeout!"),
            Selected::Exhausted => break,
        }
    }

    tracing::debug!("Select round received {} messages", received);
    Ok(())
}
