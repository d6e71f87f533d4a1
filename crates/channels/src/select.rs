//! Waiting on the first ready of several channels or a deadline.

use std::{
    thread,
    time::{Duration, Instant},
};

use crossbeam::channel;

use crate::ReceiveChannel;

/// Outcome of one [`Multiplexer::wait`] round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selected<T> {
    /// A value was taken from the source registered at `index`.
    Received { index: usize, value: T },

    /// The source at `index` is closed and drained. It is retired and will
    /// not be reported again.
    Closed { index: usize },

    /// The deadline passed before any source became ready. Nothing was
    /// consumed.
    Timeout,

    /// Every source has been retired and no deadline is set.
    Exhausted,
}

impl<T> Selected<T> {
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Selected::Timeout)
    }

    #[must_use]
    pub fn into_value(self) -> Option<T> {
        match self {
            Selected::Received { value, .. } => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Deadline {
    At(Instant),
    Every(Duration),
}

/// `Multiplexer` blocks on whichever registered source becomes ready first.
///
/// When several sources are ready at once the pick among them is random, so
/// callers must not rely on any ordering across sources.
///
/// ```
/// use ewe_channels::{bounded, Multiplexer, Selected};
/// use std::time::Duration;
///
/// let (_quiet_tx, quiet) = bounded::<u32>(1);
/// let (busy_tx, busy) = bounded::<u32>(1);
/// busy_tx.send(7).unwrap();
///
/// let mut mux = Multiplexer::new()
///     .with_source(&quiet)
///     .with_source(&busy)
///     .timeout(Duration::from_millis(50));
///
/// assert_eq!(mux.wait(), Selected::Received { index: 1, value: 7 });
/// assert_eq!(mux.wait(), Selected::Timeout);
/// ```
pub struct Multiplexer<'a, T> {
    sources: Vec<Option<&'a ReceiveChannel<T>>>,
    deadline: Option<Deadline>,
}

impl<T> Default for Multiplexer<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> Multiplexer<'a, T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            deadline: None,
        }
    }

    /// `source` registers a channel and returns the index it is reported under.
    pub fn source(&mut self, channel: &'a ReceiveChannel<T>) -> usize {
        self.sources.push(Some(channel));
        self.sources.len() - 1
    }

    #[must_use]
    pub fn with_source(mut self, channel: &'a ReceiveChannel<T>) -> Self {
        self.source(channel);
        self
    }

    /// `deadline` bounds every following wait by the same instant.
    #[must_use]
    pub fn deadline(mut self, at: Instant) -> Self {
        self.deadline = Some(Deadline::At(at));
        self
    }

    /// `timeout` re-arms a fresh timer of `dur` on each wait.
    #[must_use]
    pub fn timeout(mut self, dur: Duration) -> Self {
        self.deadline = Some(Deadline::Every(dur));
        self
    }

    /// `retire` stops watching the source at `index`.
    pub fn retire(&mut self, index: usize) {
        if let Some(slot) = self.sources.get_mut(index) {
            *slot = None;
        }
    }

    /// Number of sources still being watched.
    #[must_use]
    pub fn active(&self) -> usize {
        self.sources.iter().filter(|s| s.is_some()).count()
    }

    /// `wait` blocks until one source yields a value or reports closed, or
    /// until the deadline passes.
    pub fn wait(&mut self) -> Selected<T> {
        let deadline = match self.deadline {
            Some(Deadline::At(at)) => Some(at),
            Some(Deadline::Every(dur)) => Some(Instant::now() + dur),
            None => None,
        };

        let mut sel = channel::Select::new();
        let mut slots: Vec<(usize, &'a ReceiveChannel<T>, usize, usize)> =
            Vec::with_capacity(self.sources.len());

        for (index, source) in self.sources.iter().enumerate() {
            if let Some(channel) = *source {
                let data = sel.recv(channel.source());
                let watch = sel.recv(channel.close_watch());
                slots.push((index, channel, data, watch));
            }
        }

        if slots.is_empty() {
            return match deadline {
                Some(at) => {
                    let now = Instant::now();
                    if at > now {
                        thread::sleep(at - now);
                    }
                    Selected::Timeout
                }
                None => Selected::Exhausted,
            };
        }

        let op = match deadline {
            Some(at) => match sel.select_deadline(at) {
                Ok(op) => op,
                Err(_) => return Selected::Timeout,
            },
            None => sel.select(),
        };

        let picked = op.index();
        let Some(&(index, channel, data, _)) = slots
            .iter()
            .find(|(_, _, data, watch)| *data == picked || *watch == picked)
        else {
            unreachable!("selected operation {picked} was never registered");
        };

        match channel.complete(op, data) {
            Some(value) => Selected::Received { index, value },
            None => {
                tracing::debug!("Multiplexer source {} drained, retiring it", index);
                self.sources[index] = None;
                Selected::Closed { index }
            }
        }
    }
}
