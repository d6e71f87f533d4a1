use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    thread,
    time::{Duration, Instant},
};

use crossbeam::channel;

use crate::{ChannelError, Result};

/// `CloseSignal` is shared by every handle of one channel. Closing drops
/// the only sender of the `watch` channel so any thread blocked in a
/// select on it wakes up to find the channel disconnected.
///
/// Senders commit a value only while holding a `SendPermit`, taken before
/// checking the closed flag. Receivers that observed the close keep draining
/// until no permit is outstanding, so a value is either delivered or its
/// send panics.
pub(crate) struct CloseSignal {
    closed: AtomicBool,
    inflight: AtomicUsize,
    trigger: Mutex<Option<channel::Sender<()>>>,
    watch: channel::Receiver<()>,
}

/// Marks one send as committing a value into the channel.
struct SendPermit<'a> {
    inflight: &'a AtomicUsize,
}

impl Drop for SendPermit<'_> {
    fn drop(&mut self) {
        self.inflight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl CloseSignal {
    fn new() -> Self {
        let (trigger, watch) = channel::bounded::<()>(0);
        Self {
            closed: AtomicBool::new(false),
            inflight: AtomicUsize::new(0),
            trigger: Mutex::new(Some(trigger)),
            watch,
        }
    }

    #[inline]
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    #[inline]
    pub(crate) fn watch(&self) -> &channel::Receiver<()> {
        &self.watch
    }

    /// `permit` returns `None` once the channel is closed.
    fn permit(&self) -> Option<SendPermit<'_>> {
        self.inflight.fetch_add(1, Ordering::SeqCst);
        let permit = SendPermit {
            inflight: &self.inflight,
        };
        if self.is_closed() {
            return None;
        }
        Some(permit)
    }

    fn has_inflight(&self) -> bool {
        self.inflight.load(Ordering::SeqCst) > 0
    }

    /// `close` returns false when the signal had already fired.
    fn close(&self) -> bool {
        let mut trigger = match self.trigger.lock() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        };

        match trigger.take() {
            Some(sender) => {
                self.closed.store(true, Ordering::SeqCst);
                drop(sender);
                true
            }
            None => false,
        }
    }
}

/// `create` returns a bounded channel for `Some(capacity)` (where zero means
/// rendezvous) and an unbounded one for `None`.
#[must_use]
pub fn create<T>(capacity: Option<usize>) -> (SendChannel<T>, ReceiveChannel<T>) {
    match capacity {
        Some(cap) => bounded(cap),
        None => unbounded(),
    }
}

/// `bounded` creates a channel holding at most `capacity` pending values.
///
/// A capacity of zero yields rendezvous semantics: every send blocks until a
/// receiver takes the value.
#[must_use]
pub fn bounded<T>(capacity: usize) -> (SendChannel<T>, ReceiveChannel<T>) {
    let (tx, rx) = channel::bounded::<T>(capacity);
    from_parts(tx, rx)
}

#[must_use]
pub fn unbounded<T>() -> (SendChannel<T>, ReceiveChannel<T>) {
    let (tx, rx) = channel::unbounded::<T>();
    from_parts(tx, rx)
}

/// `rendezvous` is shorthand for `bounded(0)`.
#[must_use]
pub fn rendezvous<T>() -> (SendChannel<T>, ReceiveChannel<T>) {
    bounded(0)
}

fn from_parts<T>(
    tx: channel::Sender<T>,
    rx: channel::Receiver<T>,
) -> (SendChannel<T>, ReceiveChannel<T>) {
    let signal = Arc::new(CloseSignal::new());
    let sender = SendChannel {
        src: tx,
        signal: signal.clone(),
    };
    let receiver = ReceiveChannel { src: rx, signal };
    (sender, receiver)
}

/// `ChannelGroup` holds both ends of a channel for the orchestrator that
/// creates it and hands out narrowed endpoints to actors.
pub struct ChannelGroup<E>(pub SendChannel<E>, pub ReceiveChannel<E>);

impl<E> Clone for ChannelGroup<E> {
    fn clone(&self) -> Self {
        Self(self.0.clone(), self.1.clone())
    }
}

impl<E> ChannelGroup<E> {
    #[must_use]
    pub fn new(capacity: Option<usize>) -> Self {
        let (sender, receiver) = create::<E>(capacity);
        Self(sender, receiver)
    }

    #[must_use]
    pub fn send_only(&self) -> SendOnly<E> {
        self.0.clone().send_only()
    }

    #[must_use]
    pub fn receiver(&self) -> ReceiveChannel<E> {
        self.1.clone()
    }

    #[must_use]
    pub fn split(self) -> (SendChannel<E>, ReceiveChannel<E>) {
        (self.0, self.1)
    }
}

/// The publishing capability of a channel without the right to close it.
pub trait SendOnlyChannel<T> {
    /// Blocks until the value is buffered or handed to a receiver.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Disconnected`] when every receiver is gone.
    ///
    /// # Panics
    ///
    /// Panics if the channel was already closed.
    fn send(&self, t: T) -> Result<()>;

    /// # Errors
    ///
    /// Returns [`ChannelError::Full`] or [`ChannelError::Disconnected`].
    ///
    /// # Panics
    ///
    /// Panics if the channel was already closed.
    fn try_send(&self, t: T) -> Result<()>;
}

/// `SendChannel` is the producer's handle: it can send and it can close.
///
/// Clones share the same closed state, so a close through any clone is
/// observed by all of them.
pub struct SendChannel<T> {
    src: channel::Sender<T>,
    signal: Arc<CloseSignal>,
}

impl<T> Clone for SendChannel<T> {
    fn clone(&self) -> Self {
        Self {
            src: self.src.clone(),
            signal: self.signal.clone(),
        }
    }
}

impl<T> fmt::Debug for SendChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendChannel")
            .field("len", &self.src.len())
            .field("capacity", &self.src.capacity())
            .field("closed", &self.signal.is_closed())
            .finish()
    }
}

impl<T> SendChannel<T> {
    /// `send_only` narrows this handle so its holder can no longer close
    /// the channel.
    #[must_use]
    pub fn send_only(self) -> SendOnly<T> {
        SendOnly { channel: self }
    }

    /// [`SendChannel`].send() blocks the current thread while the channel is
    /// at capacity (or, for rendezvous channels, until a receiver is ready).
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Disconnected`] when every receiver is gone.
    ///
    /// # Panics
    ///
    /// Sending on a closed channel is a programming error and panics, also
    /// when the send was already waiting for room as the channel closed.
    pub fn send(&self, t: T) -> Result<()> {
        self.deliver(t, None)
    }

    /// # Errors
    ///
    /// Returns [`ChannelError::Full`] when no space (or no waiting receiver)
    /// is available and [`ChannelError::Disconnected`] when every receiver
    /// is gone.
    ///
    /// # Panics
    ///
    /// Panics if the channel was already closed.
    pub fn try_send(&self, t: T) -> Result<()> {
        let Some(_permit) = self.signal.permit() else {
            panic!("send on closed channel");
        };
        match self.src.try_send(t) {
            Ok(()) => Ok(()),
            Err(channel::TrySendError::Full(_)) => Err(ChannelError::Full),
            Err(channel::TrySendError::Disconnected(_)) => Err(ChannelError::Disconnected),
        }
    }

    /// # Errors
    ///
    /// Returns [`ChannelError::Timeout`] if no space was made within `dur`.
    ///
    /// # Panics
    ///
    /// Panics if the channel is closed before the value was delivered.
    pub fn send_timeout(&self, t: T, dur: Duration) -> Result<()> {
        self.deliver(t, Some(Instant::now() + dur))
    }

    /// `close` marks the channel as closed. Values already buffered stay
    /// receivable; receivers get `None` once they are drained.
    ///
    /// # Panics
    ///
    /// Closing an already closed channel panics.
    pub fn close(&self) {
        if !self.signal.close() {
            panic!("close of closed channel");
        }
        tracing::debug!("Channel closed with {} pending values", self.src.len());
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.signal.is_closed()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.src.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.src.is_empty()
    }

    /// `None` for unbounded channels.
    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.src.capacity()
    }

    /// `deliver` retries a non-blocking send, parking between attempts
    /// until the channel has room or gets closed. The closed flag is checked
    /// under a permit before every attempt, so a send that was waiting when
    /// the channel closed panics instead of landing after the close.
    fn deliver(&self, mut t: T, deadline: Option<Instant>) -> Result<()> {
        loop {
            {
                let Some(_permit) = self.signal.permit() else {
                    panic!("send on closed channel");
                };
                match self.src.try_send(t) {
                    Ok(()) => return Ok(()),
                    Err(channel::TrySendError::Disconnected(_)) => {
                        return Err(ChannelError::Disconnected)
                    }
                    Err(channel::TrySendError::Full(value)) => t = value,
                }
            }

            let mut sel = channel::Select::new();
            let _room = sel.send(&self.src);
            let _closed = sel.recv(self.signal.watch());
            match deadline {
                Some(at) => {
                    if sel.ready_deadline(at).is_err() {
                        return Err(ChannelError::Timeout);
                    }
                }
                None => {
                    let _ = sel.ready();
                }
            }
        }
    }
}

impl<T> SendOnlyChannel<T> for SendChannel<T> {
    fn send(&self, t: T) -> Result<()> {
        SendChannel::send(self, t)
    }

    fn try_send(&self, t: T) -> Result<()> {
        SendChannel::try_send(self, t)
    }
}

/// `SendOnly` can publish into a channel but never close it.
pub struct SendOnly<T> {
    channel: SendChannel<T>,
}

impl<T> Clone for SendOnly<T> {
    fn clone(&self) -> Self {
        Self {
            channel: self.channel.clone(),
        }
    }
}

impl<T> fmt::Debug for SendOnly<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SendOnly").field(&self.channel).finish()
    }
}

impl<T> SendOnly<T> {
    /// # Errors
    ///
    /// Returns [`ChannelError::Timeout`] if no space was made within `dur`.
    ///
    /// # Panics
    ///
    /// Panics if the channel is closed before the value was delivered.
    pub fn send_timeout(&self, t: T, dur: Duration) -> Result<()> {
        self.channel.send_timeout(t, dur)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.channel.is_closed()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.channel.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.channel.capacity()
    }
}

impl<T> SendOnlyChannel<T> for SendOnly<T> {
    fn send(&self, t: T) -> Result<()> {
        self.channel.send(t)
    }

    fn try_send(&self, t: T) -> Result<()> {
        self.channel.try_send(t)
    }
}

/// `ReceiveChannel` is the consuming end of a channel. It can neither send
/// nor close, and clones compete for values (each value is delivered to
/// exactly one receiver).
pub struct ReceiveChannel<T> {
    src: channel::Receiver<T>,
    signal: Arc<CloseSignal>,
}

impl<T> Clone for ReceiveChannel<T> {
    fn clone(&self) -> Self {
        Self {
            src: self.src.clone(),
            signal: self.signal.clone(),
        }
    }
}

impl<T> fmt::Debug for ReceiveChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReceiveChannel")
            .field("len", &self.src.len())
            .field("capacity", &self.src.capacity())
            .field("closed", &self.signal.is_closed())
            .finish()
    }
}

impl<T> ReceiveChannel<T> {
    /// [`ReceiveChannel`].receive() blocks the current thread till a value is
    /// available, returning `None` once the channel is closed and drained
    /// (or every sender was dropped).
    #[must_use]
    pub fn receive(&self) -> Option<T> {
        let mut sel = channel::Select::new();
        let data = sel.recv(&self.src);
        let _signal = sel.recv(self.signal.watch());
        let op = sel.select();
        self.complete(op, data)
    }

    /// # Errors
    ///
    /// Returns [`ChannelError::Timeout`] if nothing arrived within `dur` and
    /// [`ChannelError::Closed`] if the channel is closed and drained.
    pub fn receive_timeout(&self, dur: Duration) -> Result<T> {
        let mut sel = channel::Select::new();
        let data = sel.recv(&self.src);
        let _signal = sel.recv(self.signal.watch());
        match sel.select_timeout(dur) {
            Ok(op) => self.complete(op, data).ok_or(ChannelError::Closed),
            Err(_) => Err(ChannelError::Timeout),
        }
    }

    /// # Errors
    ///
    /// Returns [`ChannelError::Empty`] when nothing is pending on an open
    /// channel and [`ChannelError::Closed`] once it is closed and drained.
    pub fn try_receive(&self) -> Result<T> {
        match self.src.try_recv() {
            Ok(value) => Ok(value),
            Err(channel::TryRecvError::Disconnected) => Err(ChannelError::Closed),
            Err(channel::TryRecvError::Empty) => {
                if self.signal.is_closed() {
                    self.drain().ok_or(ChannelError::Closed)
                } else {
                    Err(ChannelError::Empty)
                }
            }
        }
    }

    /// `iter` blocks on each step and ends when the channel is closed and
    /// drained.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { channel: self }
    }

    /// Reports whether the producer called close. A channel whose senders were
    /// all dropped still reads as open here but yields `None` once drained.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.signal.is_closed()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.src.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.src.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.src.capacity()
    }

    pub(crate) fn source(&self) -> &channel::Receiver<T> {
        &self.src
    }

    pub(crate) fn close_watch(&self) -> &channel::Receiver<()> {
        self.signal.watch()
    }

    /// `complete` finishes a select in which this channel registered its
    /// data operation at index `data` and its close watch elsewhere.
    pub(crate) fn complete(&self, op: channel::SelectedOperation<'_>, data: usize) -> Option<T> {
        if op.index() == data {
            return op.recv(&self.src).ok();
        }

        // The close watch only ever resolves by disconnecting.
        let _ = op.recv(self.signal.watch());
        self.drain()
    }

    /// `drain` takes the next value of a closed channel, waiting out sends
    /// that passed the closed check before the close.
    fn drain(&self) -> Option<T> {
        loop {
            if let Ok(value) = self.src.try_recv() {
                return Some(value);
            }
            if !self.signal.has_inflight() {
                return self.src.try_recv().ok();
            }
            thread::yield_now();
        }
    }
}

pub struct Iter<'a, T> {
    channel: &'a ReceiveChannel<T>,
}

impl<T> Iterator for Iter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.channel.receive()
    }
}

pub struct IntoIter<T> {
    channel: ReceiveChannel<T>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.channel.receive()
    }
}

impl<T> IntoIterator for ReceiveChannel<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter { channel: self }
    }
}

impl<'a, T> IntoIterator for &'a ReceiveChannel<T> {
    type Item = T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
