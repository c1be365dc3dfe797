//! In-process publisher of named channels.
//!
//! Each channel is a `broadcast` sender, optionally latching its last value
//! for subscribers that arrive late.

use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::broadcast;

use super::OutputSink;

/// Messages buffered per subscriber before it starts lagging.
pub const DEFAULT_CAPACITY: usize = 64;

struct Channel {
    tx: broadcast::Sender<Bytes>,
    latched: Option<Bytes>,
}

impl Channel {
    fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, latched: None }
    }
}

/// Concurrent registry of named broadcast channels.
///
/// Publishing never blocks; a channel with no subscribers discards the value
/// unless latching keeps it for the next subscriber.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use downlink::dispatch::{ChannelHub, OutputSink};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let hub = ChannelHub::new(true);
/// hub.publish("/from_fc/data", Bytes::from_static(b"frame"));
///
/// // Late subscribers see the latched value first.
/// let mut sub = hub.subscribe("/from_fc/data");
/// assert_eq!(sub.next().await, Some(Bytes::from_static(b"frame")));
/// # }
/// ```
pub struct ChannelHub {
    channels: DashMap<String, Channel>,
    latch: bool,
    capacity: usize,
}

impl ChannelHub {
    /// Create a hub with the default per-subscriber capacity.
    #[must_use]
    pub fn new(latch: bool) -> Self { Self::with_capacity(latch, DEFAULT_CAPACITY) }

    /// Create a hub buffering `capacity` values per subscriber.
    ///
    /// A zero capacity is raised to one.
    #[must_use]
    pub fn with_capacity(latch: bool, capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            latch,
            capacity: capacity.max(1),
        }
    }

    /// Report whether the hub retains the last value per channel.
    #[must_use]
    pub fn is_latched(&self) -> bool { self.latch }

    /// Subscribe to `channel`, creating it if needed.
    ///
    /// The latched value, if any, is delivered before live values. Latched
    /// value and live subscription are taken under the same entry lock, so
    /// no publication is seen twice or skipped.
    #[must_use]
    pub fn subscribe(&self, channel: &str) -> ChannelSubscription {
        let entry = self
            .channels
            .entry(channel.to_owned())
            .or_insert_with(|| Channel::new(self.capacity));
        ChannelSubscription {
            channel: channel.to_owned(),
            latched: entry.latched.clone(),
            rx: entry.tx.subscribe(),
        }
    }

    /// Last latched value on `channel`.
    #[must_use]
    pub fn latest(&self, channel: &str) -> Option<Bytes> {
        self.channels
            .get(channel)
            .and_then(|entry| entry.latched.clone())
    }

    /// Names of every known channel, sorted.
    #[must_use]
    pub fn channels(&self) -> Vec<String> {
        let mut names: Vec<String> = self.channels.iter().map(|entry| entry.key().clone()).collect();
        names.sort_unstable();
        names
    }
}

impl OutputSink for ChannelHub {
    fn declare(&self, channel: &str) {
        self.channels
            .entry(channel.to_owned())
            .or_insert_with(|| Channel::new(self.capacity));
    }

    fn publish(&self, channel: &str, payload: Bytes) {
        let mut entry = self.channels.entry(channel.to_owned()).or_insert_with(|| {
            log::debug!("publishing on undeclared channel: channel={channel}");
            Channel::new(self.capacity)
        });
        if self.latch {
            entry.latched = Some(payload.clone());
        }
        // No receivers is not an error for a publisher.
        let _ = entry.tx.send(payload);
    }
}

/// Handle returned by [`ChannelHub::subscribe`].
pub struct ChannelSubscription {
    channel: String,
    latched: Option<Bytes>,
    rx: broadcast::Receiver<Bytes>,
}

impl ChannelSubscription {
    /// Channel this subscription listens on.
    #[must_use]
    pub fn channel(&self) -> &str { &self.channel }

    /// Wait for the next value.
    ///
    /// Values a slow subscriber missed are skipped with a warning. Returns
    /// `None` once the hub is dropped.
    pub async fn next(&mut self) -> Option<Bytes> {
        if let Some(latched) = self.latched.take() {
            return Some(latched);
        }
        loop {
            match self.rx.recv().await {
                Ok(payload) => return Some(payload),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!(
                        "subscriber lagged, values skipped: channel={}, skipped={skipped}",
                        self.channel
                    );
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
