//! Consumer side of the handoff queue.
//!
//! The [`Reassembler`] turns each dequeued [`FragmentGroup`] into one buffer,
//! decodes it with the configured [`MessageCodec`] and publishes the
//! decomposed sub-messages. Nothing that goes wrong with a single group stops
//! the loop: every failure costs that group only.

mod buffer;


pub use buffer::{MAX_RECONSTRUCTED_LEN, ReconstructError, reconstruct};
use log::{debug, error, info, warn};
use tokio::select;
use tokio_util::sync::CancellationToken;

use crate::{
    codec::MessageCodec,
    dispatch::OutputSink,
    fragment::{FragmentGroup, SeqId},
    handoff::HandoffReceiver,
    health::Activity,
    metrics::{self, DispatchResult},
    panic,
};

/// Why a group produced no output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// The declared size exceeds [`MAX_RECONSTRUCTED_LEN`].
    TooLarge,
    /// The codec rejected the buffer.
    DecodeFailed,
    /// The codec decoded nothing from the buffer.
    NoMessages,
    /// The codec panicked.
    CodecPanicked,
}

/// Result of processing one group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The first decoded message was decomposed; `published` channels
    /// received a value.
    Delivered { published: usize },
    /// Nothing was published.
    Dropped(DropReason),
}

/// Decodes fragment groups and publishes their sub-messages.
pub struct Reassembler<C, O> {
    codec: C,
    sink: O,
    prefix: String,
    channels: Vec<String>,
    activity: Activity,
    last_published: Option<SeqId>,
}

impl<C, O> Reassembler<C, O>
where
    C: MessageCodec,
    O: OutputSink,
{
    /// Create a reassembler publishing under `prefix`.
    ///
    /// Every channel the codec exposes is declared on `sink` up front.
    pub fn new(codec: C, sink: O, prefix: impl Into<String>, activity: Activity) -> Self {
        let prefix = prefix.into();
        let channels = codec.channels(&prefix);
        for channel in &channels {
            sink.declare(channel);
        }
        Self {
            codec,
            sink,
            prefix,
            channels,
            activity,
            last_published: None,
        }
    }

    /// Channels this reassembler publishes on.
    #[must_use]
    pub fn channels(&self) -> &[String] { &self.channels }

    /// Highest sequence id handed to dispatch so far.
    #[must_use]
    pub const fn last_published(&self) -> Option<SeqId> { self.last_published }

    /// Reconstruct, decode and publish one group.
    pub fn process(&mut self, group: FragmentGroup) -> DispatchOutcome {
        let outcome = self.dispatch(&group);
        match outcome {
            DispatchOutcome::Delivered { .. } => {
                metrics::inc_dispatch(DispatchResult::Delivered);
                self.activity.record_delivered();
            }
            DispatchOutcome::Dropped(_) => {
                metrics::inc_dispatch(DispatchResult::Dropped);
                self.activity.record_dropped();
            }
        }
        outcome
    }

    fn track_order(&mut self, seq_id: SeqId) {
        if let Some(last) = self.last_published
            && seq_id < last
        {
            warn!("publishing out-of-order group: last_published={last}, seq_id={seq_id}");
            metrics::inc_out_of_order();
            self.activity.record_out_of_order();
        }
        self.last_published = Some(self.last_published.map_or(seq_id, |last| last.max(seq_id)));
    }

    fn dispatch(&mut self, group: &FragmentGroup) -> DispatchOutcome {
        let seq_id = group.seq_id();
        self.track_order(seq_id);

        let buffer = match reconstruct(group) {
            Ok(buffer) => buffer,
            Err(e) => {
                error!("dropping group: {e}");
                return DispatchOutcome::Dropped(DropReason::TooLarge);
            }
        };
        if !group.is_complete() {
            info!(
                "reconstructed partial group: seq_id={seq_id}, received={}/{}, missing={}",
                group.received_count(),
                group.expected_count(),
                group.missing_count()
            );
        }

        let decoded = match panic::contain(|| self.codec.decode(&buffer)) {
            Ok(Ok(decoded)) => decoded,
            Ok(Err(e)) => {
                error!("failed to decode group, dropping: seq_id={seq_id}, error={e}");
                return DispatchOutcome::Dropped(DropReason::DecodeFailed);
            }
            Err(caught) => {
                error!("codec panicked while decoding, dropping group: seq_id={seq_id}, panic={caught}");
                return DispatchOutcome::Dropped(DropReason::CodecPanicked);
            }
        };
        debug!("decoded group: seq_id={seq_id}, messages={}", decoded.len());

        let Some(message) = decoded.into_iter().next() else {
            error!(
                "no message decoded, fragments missed: seq_id={seq_id}, received={}/{}",
                group.received_count(),
                group.expected_count()
            );
            return DispatchOutcome::Dropped(DropReason::NoMessages);
        };

        let prefix = &self.prefix;
        let codec = &self.codec;
        let decomposed = match panic::contain(|| codec.decompose(message, prefix)) {
            Ok(decomposed) => decomposed,
            Err(caught) => {
                error!(
                    "codec panicked while decomposing, dropping group: seq_id={seq_id}, \
                     panic={caught}"
                );
                return DispatchOutcome::Dropped(DropReason::CodecPanicked);
            }
        };

        let mut published = 0;
        for channel in &self.channels {
            if let Some(payload) = decomposed.get(channel) {
                debug!("publishing: channel={channel}, seq_id={seq_id}, len={}", payload.len());
                self.sink.publish(channel, payload.clone());
                published += 1;
            } else {
                let mut available: Vec<&str> = decomposed.keys().map(String::as_str).collect();
                available.sort_unstable();
                warn!(
                    "channel missing from decomposed message: channel={channel}, \
                     seq_id={seq_id}, available={available:?}"
                );
            }
        }
        DispatchOutcome::Delivered { published }
    }

    /// Process groups from `queue` until `shutdown` is cancelled or the
    /// listener drops its end of the queue.
    #[expect(
        clippy::integer_division_remainder_used,
        reason = "tokio::select! expands to modulus internally"
    )]
    pub async fn run(mut self, mut queue: HandoffReceiver, shutdown: CancellationToken) {
        loop {
            let next = select! {
                biased;

                () = shutdown.cancelled() => break,
                next = queue.recv() => next,
            };
            let Some(group) = next else {
                info!("handoff queue closed, reassembler stopping");
                break;
            };
            debug!(
                "dequeued group: seq_id={}, received={}/{}, still_queued={}",
                group.seq_id(),
                group.received_count(),
                group.expected_count(),
                queue.len()
            );
            self.process(group);
        }
        debug!("reassembler stopped: last_published={:?}", self.last_published);
    }
}
