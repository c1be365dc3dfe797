//! Publication of decomposed sub-messages to named output channels.
//!
//! The reassembler only needs [`OutputSink`]. [`ChannelHub`] is the in-process
//! implementation used by the binary: subscribers attach by channel name and
//! optionally receive the last latched value on arrival.

use std::sync::Arc;

use bytes::Bytes;

pub mod hub;

pub use hub::{ChannelHub, ChannelSubscription};

/// Destination for decomposed sub-messages.
pub trait OutputSink: Send + Sync + 'static {
    /// Announce a channel before anything is published on it.
    ///
    /// Called once per channel when the receiver starts. The default does
    /// nothing.
    fn declare(&self, channel: &str) { let _ = channel; }

    /// Publish `payload` on `channel`.
    fn publish(&self, channel: &str, payload: Bytes);
}

impl<T: OutputSink + ?Sized> OutputSink for Arc<T> {
    fn declare(&self, channel: &str) { (**self).declare(channel); }

    fn publish(&self, channel: &str, payload: Bytes) { (**self).publish(channel, payload); }
}
