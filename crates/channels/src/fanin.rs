use std::thread;

use crate::{create, Multiplexer, ReceiveChannel, SendChannel, Selected};

/// `fan_in` merges `sources` into a single receiver.
///
/// A forwarding thread multiplexes over the sources and republishes every
/// value; the merged channel is closed once all sources are closed and
/// drained. Ordering is preserved per source, never across sources.
///
/// Dropping the merged receiver does not stop the forwarder right away: it
/// notices on the next value it tries to republish, then stops and drops the
/// sources. While every source stays open and silent the forwarding thread
/// stays parked, so close the sources to release it.
#[must_use]
pub fn fan_in<T: Send + 'static>(
    sources: Vec<ReceiveChannel<T>>,
    capacity: Option<usize>,
) -> ReceiveChannel<T> {
    let (sender, receiver) = create::<T>(capacity);

    thread::spawn(move || {
        forward(&sources, &sender);
        sender.close();
    });

    receiver
}

fn forward<T>(sources: &[ReceiveChannel<T>], sender: &SendChannel<T>) {
    let mut mux = Multiplexer::new();
    for source in sources {
        mux.source(source);
    }

    loop {
        match mux.wait() {
            Selected::Received { value, .. } => {
                if sender.send(value).is_err() {
                    tracing::debug!("Fan-in output has no receivers left, stopping");
                    return;
                }
            }
            Selected::Closed { index } => {
                tracing::debug!("Fan-in source {} drained", index);
            }
            Selected::Exhausted | Selected::Timeout => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bounded, unbounded, ChannelError};
    use std::time::Duration;

    #[test]
    #[ntest::timeout(3000)]
    fn should_merge_sources_and_close_when_all_drained() {
        let (first_tx, first) = bounded::<u32>(4);
        let (second_tx, second) = bounded::<u32>(4);

        let merged = fan_in(vec![first, second], None);

        let producer = thread::spawn(move || {
            for i in 0..3 {
                first_tx.send(i).expect("should send");
                second_tx.send(100 + i).expect("should send");
            }
            first_tx.close();
            second_tx.close();
        });

        let values: Vec<u32> = merged.iter().collect();
        producer.join().expect("producer should finish");

        let from_first: Vec<u32> = values.iter().copied().filter(|v| *v < 100).collect();
        let from_second: Vec<u32> = values.iter().copied().filter(|v| *v >= 100).collect();

        assert_eq!(values.len(), 6);
        assert_eq!(from_first, vec![0, 1, 2]);
        assert_eq!(from_second, vec![100, 101, 102]);
        assert!(merged.is_closed());
    }

    #[test]
    #[ntest::timeout(3000)]
    fn should_stop_forwarding_after_merged_receiver_is_dropped() {
        let (sender, source) = unbounded::<u32>();
        let merged = fan_in(vec![source], None);
        drop(merged);

        // the forwarder takes this value, fails to republish it and exits,
        // releasing the only receiver of the source
        sender.send(1).expect("forwarder still holds the source");

        let mut value = 2;
        loop {
            match sender.send(value) {
                Err(ChannelError::Disconnected) => break,
                Ok(()) => value += 1,
                Err(other) => panic!("unexpected send error {other:?}"),
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!sender.is_closed());
    }
}
