use std::thread;
use std::time::Duration;

use ewe_channels::{bounded, rendezvous, ReceiveChannel, SendOnly, SendOnlyChannel};

use crate::config::DemoConfig;

pub fn run(_config: &DemoConfig) -> anyhow::Result<()> {
    unbuffered()?;
    buffered()?;
    directional()?;
    closing()?;
    Ok(())
}

fn unbuffered() -> anyhow::Result<()> {
    let (tx, rx) = rendezvous::<String>();
    let producer = thread::spawn(move || tx.send(String::from("Hello from an actor!")));

    let message = rx.receive();
    println!("Unbuffered: {message:?}");

    producer
        .join()
        .map_err(|_| anyhow::anyhow!("unbuffered producer panicked"))??;
    Ok(())
}

fn buffered() -> anyhow::Result<()> {
    let (tx, rx) = bounded::<&str>(2);
    tx.send("first")?;
    tx.send("second")?;
    println!("Buffered: len {} of capacity {:?}", tx.len(), tx.capacity());

    println!("Buffered: {:?}", rx.receive());
    println!("Buffered: {:?}", rx.receive());
    Ok(())
}

fn produce(out: &SendOnly<u32>, values: &[u32]) -> anyhow::Result<()> {
    for value in values {
        out.send(*value)?;
    }
    Ok(())
}

fn consume(input: &ReceiveChannel<u32>, count: usize) -> Vec<u32> {
    input.iter().take(count).collect()
}

fn directional() -> anyhow::Result<()> {
    let (tx, rx) = bounded::<u32>(3);
    let values = [42, 100, 7];

    let out = tx.send_only();
    let producer = thread::spawn(move || produce(&out, &values));

    let received = consume(&rx, values.len());
    println!("Directional: {received:?}");

    producer
        .join()
        .map_err(|_| anyhow::anyhow!("directional producer panicked"))??;
    anyhow::ensure!(received == values, "values arrived out of order");
    Ok(())
}

fn closing() -> anyhow::Result<()> {
    let (tx, rx) = bounded::<u32>(5);

    let producer = thread::spawn(move || {
        for value in 1..=5u32 {
            if tx.send(value * value).is_err() {
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
        tx.close();
    });

    let squares: Vec<u32> = rx.iter().collect();
    println!("Squares until close: {squares:?}");

    let after = rx.receive();
    println!("Receive after close: {after:?} (closed: {})", rx.is_closed());

    producer
        .join()
        .map_err(|_| anyhow::anyhow!("closing producer panicked"))?;
    anyhow::ensure!(after.is_none(), "closed channel yielded a value");
    Ok(())
}
