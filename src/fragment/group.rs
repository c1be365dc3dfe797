//! Per-message fragment bookkeeping.
//!
//! A [`FragmentGroup`] collects the payloads that share one [`SeqId`]. It is
//! created by the fragment table, travels through the handoff queue as a
//! whole, and is consumed by the reassembler.

use std::collections::{BTreeMap, btree_map::Entry};

use bytes::Bytes;

use super::{FragmentIndex, SeqId};

/// Result of recording a payload in a [`FragmentGroup`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The index had not been seen before.
    Fresh,
    /// The index was already present; its payload was overwritten.
    Duplicate,
    /// The index does not fit the group's expected count and was discarded.
    OutOfRange,
}

/// Fragments received so far for one message.
///
/// Invariant: every key in the received map is below `expected_count`, so the
/// number of distinct fragments never exceeds the expected count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FragmentGroup {
    seq_id: SeqId,
    expected_count: u32,
    block_len: usize,
    received: BTreeMap<FragmentIndex, Bytes>,
}

impl FragmentGroup {
    /// Start an empty group expecting `expected_count` fragments of
    /// `block_len` payload bytes each.
    #[must_use]
    pub fn new(seq_id: SeqId, expected_count: u32, block_len: usize) -> Self {
        Self {
            seq_id,
            expected_count,
            block_len,
            received: BTreeMap::new(),
        }
    }

    /// Identifier of the message this group reassembles.
    #[must_use]
    pub const fn seq_id(&self) -> SeqId { self.seq_id }

    /// Fragment count taken from the first fragment seen for this message.
    #[must_use]
    pub const fn expected_count(&self) -> u32 { self.expected_count }

    /// Payload length reserved for each fragment in the reconstructed buffer.
    #[must_use]
    pub const fn block_len(&self) -> usize { self.block_len }

    /// Number of distinct fragment indices received.
    #[must_use]
    pub fn received_count(&self) -> usize { self.received.len() }

    /// Number of indices in `0..expected_count` that have not arrived.
    ///
    /// Constant time, unlike [`missing_indices`](Self::missing_indices).
    #[must_use]
    pub fn missing_count(&self) -> u32 {
        let received = u32::try_from(self.received.len()).unwrap_or(u32::MAX);
        self.expected_count.saturating_sub(received)
    }

    /// Report whether every fragment `0..expected_count` has arrived.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        u32::try_from(self.received.len()).is_ok_and(|len| len == self.expected_count)
    }

    /// Record `payload` at `index`, replacing any earlier payload there.
    pub fn insert(&mut self, index: FragmentIndex, payload: Bytes) -> InsertOutcome {
        if index.get() >= self.expected_count {
            return InsertOutcome::OutOfRange;
        }
        match self.received.entry(index) {
            Entry::Occupied(mut occupied) => {
                occupied.insert(payload);
                InsertOutcome::Duplicate
            }
            Entry::Vacant(vacant) => {
                vacant.insert(payload);
                InsertOutcome::Fresh
            }
        }
    }

    /// Borrow the payload stored at `index`, if it arrived.
    #[must_use]
    pub fn payload(&self, index: FragmentIndex) -> Option<&Bytes> { self.received.get(&index) }

    /// Indices in `0..expected_count` that have not arrived, ascending.
    #[must_use]
    pub fn missing_indices(&self) -> Vec<FragmentIndex> {
        (0..self.expected_count)
            .map(FragmentIndex::new)
            .filter(|index| !self.received.contains_key(index))
            .collect()
    }

    /// Iterate received fragments in index order.
    pub fn iter(&self) -> impl Iterator<Item = (FragmentIndex, &Bytes)> {
        self.received.iter().map(|(index, payload)| (*index, payload))
    }
}
