//! Integration tests for channel hand-off, closing and multiplexed waiting.

use ewe_channels::{
    bounded, fan_in, rendezvous, unbounded, Multiplexer, ReceiveChannel, Selected, SendOnly,
    SendOnlyChannel,
};
use std::thread;
use std::time::{Duration, Instant};

fn produce_in_order(
    sender: ewe_channels::SendChannel<u32>,
    values: Vec<u32>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for value in values {
            sender.send(value).expect("should send");
        }
        sender.close();
    })
}

#[test]
#[ntest::timeout(5000)]
fn test_fifo_order_on_buffered_channel() {
    let (sender, receiver) = bounded::<u32>(3);
    let producer = produce_in_order(sender, vec![1, 2, 3]);

    let received: Vec<u32> = receiver.iter().collect();
    producer.join().unwrap();

    assert_eq!(received, vec![1, 2, 3]);
}

#[test]
#[ntest::timeout(5000)]
fn test_fifo_order_on_unbuffered_channel() {
    let (sender, receiver) = rendezvous::<u32>();
    let producer = produce_in_order(sender, vec![1, 2, 3]);

    let received: Vec<u32> = receiver.into_iter().collect();
    producer.join().unwrap();

    assert_eq!(received, vec![1, 2, 3]);
}

#[test]
#[ntest::timeout(5000)]
fn test_fifo_order_under_many_values() {
    let (sender, receiver) = bounded::<u32>(8);
    let values: Vec<u32> = (0..1000).collect();
    let producer = produce_in_order(sender, values.clone());

    let received: Vec<u32> = receiver.iter().collect();
    producer.join().unwrap();

    assert_eq!(received, values);
}

#[test]
#[ntest::timeout(5000)]
fn test_closed_channel_drains_then_reports_no_more_values() {
    let (sender, receiver) = bounded::<u32>(2);
    sender.send(1).unwrap();
    sender.send(2).unwrap();
    sender.close();

    assert_eq!(receiver.receive(), Some(1));
    assert_eq!(receiver.receive(), Some(2));
    for _ in 0..3 {
        assert_eq!(receiver.receive(), None);
    }
}

#[test]
#[ntest::timeout(5000)]
fn test_close_wakes_blocked_receiver() {
    let (sender, receiver) = unbounded::<u32>();

    let consumer = thread::spawn(move || receiver.receive());

    thread::sleep(Duration::from_millis(30));
    sender.close();

    assert_eq!(consumer.join().unwrap(), None);
}

fn publish(channel: &impl SendOnlyChannel<u32>, count: u32) {
    for i in 1..=count {
        channel.send(i).expect("should send");
    }
}

fn drain(channel: &ReceiveChannel<u32>) -> Vec<u32> {
    channel.iter().collect()
}

#[test]
#[ntest::timeout(5000)]
fn test_directional_endpoints_between_threads() {
    let (sender, receiver) = bounded::<u32>(2);
    let publisher: SendOnly<u32> = sender.clone().send_only();

    let producer = thread::spawn(move || {
        publish(&publisher, 3);
        sender.close();
    });

    let consumer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        drain(&receiver)
    });

    producer.join().unwrap();
    assert_eq!(consumer.join().unwrap(), vec![1, 2, 3]);
}

#[test]
#[ntest::timeout(5000)]
fn test_multiplexed_wait_times_out_on_silent_channel() {
    let (_sender, silent) = bounded::<u32>(1);
    let mut mux = Multiplexer::new()
        .with_source(&silent)
        .timeout(Duration::from_millis(100));

    let started = Instant::now();
    let outcome = mux.wait();
    let elapsed = started.elapsed();

    assert_eq!(outcome, Selected::Timeout);
    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed <= Duration::from_millis(150), "took {elapsed:?}");
}

#[test]
#[ntest::timeout(5000)]
fn test_multiplexed_wait_takes_first_ready_source() {
    let (fast_tx, fast) = rendezvous::<&'static str>();
    let (slow_tx, slow) = rendezvous::<&'static str>();

    let fast_handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        fast_tx.send("from channel 1").unwrap();
    });
    let slow_handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(80));
        slow_tx.send("from channel 2").unwrap();
    });

    let mut mux = Multiplexer::new()
        .with_source(&fast)
        .with_source(&slow)
        .timeout(Duration::from_millis(1000));

    assert_eq!(
        mux.wait(),
        Selected::Received {
            index: 0,
            value: "from channel 1"
        }
    );
    assert_eq!(
        mux.wait(),
        Selected::Received {
            index: 1,
            value: "from channel 2"
        }
    );

    fast_handle.join().unwrap();
    slow_handle.join().unwrap();
}

#[test]
#[ntest::timeout(5000)]
fn test_slow_actor_loses_to_deadline() {
    let (done_tx, done) = bounded::<bool>(1);

    let slow = thread::spawn(move || {
        thread::sleep(Duration::from_millis(300));
        done_tx.send(true).expect("should send");
    });

    let mut mux = Multiplexer::new()
        .with_source(&done)
        .timeout(Duration::from_millis(100));
    assert!(mux.wait().is_timeout());

    slow.join().unwrap();

    // the timed out round left the late value in place
    assert_eq!(done.try_receive(), Ok(true));
}

#[test]
#[ntest::timeout(5000)]
fn test_fan_in_of_two_streams() {
    let (a_tx, a) = unbounded::<u32>();
    let (b_tx, b) = unbounded::<u32>();

    for i in 0..5 {
        a_tx.send(i).unwrap();
        b_tx.send(10 + i).unwrap();
    }
    a_tx.close();
    b_tx.close();

    let mut merged: Vec<u32> = fan_in(vec![a, b], Some(0)).into_iter().collect();
    merged.sort_unstable();

    assert_eq!(merged, vec![0, 1, 2, 3, 4, 10, 11, 12, 13, 14]);
}
