//! Queue carrying finished fragment groups from the listener to the
//! reassembler.
//!
//! The queue is unbounded: the link has no back-channel to slow the sender,
//! so pushing back here would only move the loss into the kernel receive
//! buffer. A consumer that stalls permanently therefore grows this queue
//! without limit. Elements are whole [`FragmentGroup`]s, never individual
//! fragments, so the consumer cannot observe a half-delivered group.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use thiserror::Error;
use tokio::sync::mpsc;

use crate::fragment::FragmentGroup;

/// Returned when the receiving half has been dropped.
///
/// Carries the group that could not be delivered.
#[derive(Debug, Error)]
#[error("handoff queue closed: seq_id={}", .0.seq_id())]
pub struct HandoffClosed(pub FragmentGroup);

/// Producer half, owned by the listener.
#[derive(Debug)]
pub struct HandoffSender {
    tx: mpsc::UnboundedSender<FragmentGroup>,
    depth: Arc<AtomicUsize>,
}

/// Consumer half, owned by the reassembler.
#[derive(Debug)]
pub struct HandoffReceiver {
    rx: mpsc::UnboundedReceiver<FragmentGroup>,
    depth: Arc<AtomicUsize>,
}

/// Create a connected sender/receiver pair.
///
/// # Examples
///
/// ```
/// use downlink::{
///     fragment::{FragmentGroup, SeqId},
///     handoff::handoff_queue,
/// };
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (tx, mut rx) = handoff_queue();
/// tx.send(FragmentGroup::new(SeqId::new(1), 1, 8))
///     .expect("receiver alive");
/// assert_eq!(rx.len(), 1);
/// let group = rx.recv().await.expect("group queued");
/// assert_eq!(group.seq_id(), SeqId::new(1));
/// assert!(rx.is_empty());
/// # }
/// ```
#[must_use]
pub fn handoff_queue() -> (HandoffSender, HandoffReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let depth = Arc::new(AtomicUsize::new(0));
    (
        HandoffSender {
            tx,
            depth: Arc::clone(&depth),
        },
        HandoffReceiver { rx, depth },
    )
}

impl HandoffSender {
    /// Enqueue a group without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`HandoffClosed`] carrying the group when the receiver is gone.
    pub fn send(&self, group: FragmentGroup) -> Result<(), HandoffClosed> {
        self.depth.fetch_add(1, Ordering::Relaxed);
        self.tx.send(group).map_err(|mpsc::error::SendError(group)| {
            self.depth.fetch_sub(1, Ordering::Relaxed);
            HandoffClosed(group)
        })?;
        crate::metrics::set_handoff_depth(self.len());
        Ok(())
    }

    /// Number of groups waiting to be consumed.
    #[must_use]
    pub fn len(&self) -> usize { self.depth.load(Ordering::Relaxed) }

    /// Report whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Report whether the receiver has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool { self.tx.is_closed() }
}

impl HandoffReceiver {
    /// Wait for the next group.
    ///
    /// Returns `None` once the sender is dropped and the queue is drained.
    pub async fn recv(&mut self) -> Option<FragmentGroup> {
        let group = self.rx.recv().await?;
        self.depth.fetch_sub(1, Ordering::Relaxed);
        crate::metrics::set_handoff_depth(self.len());
        Some(group)
    }

    /// Take the next group if one is ready.
    pub fn try_recv(&mut self) -> Option<FragmentGroup> {
        let group = self.rx.try_recv().ok()?;
        self.depth.fetch_sub(1, Ordering::Relaxed);
        crate::metrics::set_handoff_depth(self.len());
        Some(group)
    }

    /// Number of groups waiting to be consumed.
    #[must_use]
    pub fn len(&self) -> usize { self.depth.load(Ordering::Relaxed) }

    /// Report whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::fragment::SeqId;

    #[tokio::test]
    async fn groups_arrive_in_fifo_order() {
        let (tx, mut rx) = handoff_queue();
        for seq_id in [3, 1, 2] {
            tx.send(FragmentGroup::new(SeqId::new(seq_id), 1, 1))
                .expect("receiver alive");
        }
        assert_eq!(tx.len(), 3);

        let mut order = Vec::new();
        while let Some(group) = rx.try_recv() {
            order.push(group.seq_id().get());
        }
        assert_eq!(order, vec![3, 1, 2]);
        assert!(rx.is_empty());
    }

    #[rstest]
    fn send_after_receiver_dropped_returns_group() {
        let (tx, rx) = handoff_queue();
        drop(rx);

        let err = tx
            .send(FragmentGroup::new(SeqId::new(8), 2, 4))
            .expect_err("closed queue must reject");
        assert_eq!(err.0.seq_id(), SeqId::new(8));
        assert!(tx.is_closed());
        assert_eq!(tx.len(), 0, "rejected group must not count as queued");
    }

    #[tokio::test]
    async fn recv_ends_when_sender_dropped() {
        let (tx, mut rx) = handoff_queue();
        tx.send(FragmentGroup::new(SeqId::new(1), 1, 1))
            .expect("receiver alive");
        drop(tx);

        assert!(rx.recv().await.is_some(), "queued group still delivered");
        assert!(rx.recv().await.is_none());
    }
}
