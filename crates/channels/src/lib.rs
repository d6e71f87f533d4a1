// Crate implementing the Engineering Principles of Channels

//! Typed FIFO channels with an explicit closed state.
//!
//! A channel is created as a [`SendChannel`] / [`ReceiveChannel`] pair. The
//! producer owning the [`SendChannel`] is the only party able to
//! [`SendChannel::close`] it; actors that should only publish get a
//! [`SendOnly`] handle, and consumers only ever see the receiving side.
//!
//! Once closed, buffered values remain receivable in FIFO order and every
//! receive after the buffer is drained yields `None` rather than blocking.
//!
//! [`Multiplexer`] waits on the first ready of several receivers or a
//! deadline, and [`fan_in`] merges many receivers into one.

mod channels;
mod fanin;
mod select;

pub use channels::*;
pub use fanin::*;
pub use select::*;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChannelError>;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    #[error("Channel has being closed and drained")]
    Closed,

    #[error("Channel has no receivers left to deliver to")]
    Disconnected,

    #[error("Channel is at capacity")]
    Full,

    #[error("Channel sent nothing, possibly still open")]
    Empty,

    #[error("Channel operation timed out")]
    Timeout,
}

impl ChannelError {
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, ChannelError::Timeout)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, ChannelError::Closed)
    }
}
