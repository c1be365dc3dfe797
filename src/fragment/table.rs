//! In-memory table of partially received messages.
//!
//! [`FragmentTable`] owns every open [`FragmentGroup`] and decides, after each
//! fragment, which groups leave the table. A group leaves exactly once:
//! either because all of its fragments arrived or because it fell outside the
//! tolerance window behind the highest sequence id seen. The window is
//! measured in sequence-id distance rather than wall-clock time.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::{Fragment, FragmentGroup, InsertOutcome, SeqId};

/// What happens to a group that falls out of the tolerance window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Hand the incomplete group to the reassembler for a best-effort
    /// reconstruction with zero-filled gaps.
    #[default]
    Optimistic,
    /// Drop the incomplete group without producing output.
    Pessimistic,
}

impl EvictionPolicy {
    /// Map the boolean `pessimistic` option onto a policy.
    #[must_use]
    pub const fn from_pessimistic(pessimistic: bool) -> Self {
        if pessimistic {
            Self::Pessimistic
        } else {
            Self::Optimistic
        }
    }
}

/// Why a group left the table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Every fragment arrived.
    Complete(FragmentGroup),
    /// The group went stale under [`EvictionPolicy::Optimistic`].
    Evicted(FragmentGroup),
    /// The group went stale under [`EvictionPolicy::Pessimistic`] and was
    /// discarded.
    Pruned {
        seq_id: SeqId,
        received: usize,
        expected: u32,
    },
}

impl Disposition {
    /// Identifier of the group this disposition refers to.
    #[must_use]
    pub fn seq_id(&self) -> SeqId {
        match self {
            Self::Complete(group) | Self::Evicted(group) => group.seq_id(),
            Self::Pruned { seq_id, .. } => *seq_id,
        }
    }

    /// Return the group when it should be handed to the reassembler.
    #[must_use]
    pub fn into_group(self) -> Option<FragmentGroup> {
        match self {
            Self::Complete(group) | Self::Evicted(group) => Some(group),
            Self::Pruned { .. } => None,
        }
    }
}

/// Tracks open fragment groups and applies the completion and eviction rules.
///
/// # Examples
///
/// ```
/// use downlink::fragment::{
///     Disposition,
///     EvictionPolicy,
///     Fragment,
///     FragmentHeader,
///     FragmentIndex,
///     FragmentTable,
///     SeqId,
/// };
///
/// let mut table = FragmentTable::new(4, 20, EvictionPolicy::Optimistic);
/// let first = Fragment::new(FragmentHeader::new(SeqId::new(1), FragmentIndex::new(0), 2), &b"ab"[..]);
/// let second = Fragment::new(FragmentHeader::new(SeqId::new(1), FragmentIndex::new(1), 2), &b"cd"[..]);
///
/// assert!(table.accept(first).is_empty());
/// let ready = table.accept(second);
/// assert!(matches!(ready.as_slice(), [Disposition::Complete(group)] if group.is_complete()));
/// assert_eq!(table.tracked_len(), 0);
/// ```
#[derive(Debug)]
pub struct FragmentTable {
    block_len: usize,
    tolerance: u32,
    policy: EvictionPolicy,
    groups: BTreeMap<SeqId, FragmentGroup>,
    retired: BTreeSet<SeqId>,
    highest_seen: Option<SeqId>,
}

impl FragmentTable {
    /// Create an empty table.
    ///
    /// `block_len` is the payload length reserved per fragment when a group
    /// is reconstructed; `tolerance` is the sequence-id distance behind the
    /// highest id seen after which incomplete groups are evicted.
    #[must_use]
    pub fn new(block_len: usize, tolerance: u32, policy: EvictionPolicy) -> Self {
        Self {
            block_len,
            tolerance,
            policy,
            groups: BTreeMap::new(),
            retired: BTreeSet::new(),
            highest_seen: None,
        }
    }

    /// Record a fragment and return every group that left the table as a
    /// result: the group this fragment completed, if any, followed by stale
    /// groups in ascending sequence-id order.
    pub fn accept(&mut self, fragment: Fragment) -> Vec<Disposition> {
        let seq_id = fragment.seq_id();
        if !self.groups.contains_key(&seq_id) {
            if self.retired.contains(&seq_id) {
                debug!(
                    "ignoring fragment for retired group: seq_id={seq_id}, index={}",
                    fragment.index()
                );
                return Vec::new();
            }
            if let Some(horizon) = self.horizon()
                && seq_id < horizon
            {
                warn!(
                    "dropping fragment older than retirement horizon: seq_id={seq_id}, \
                     index={}, horizon={horizon}",
                    fragment.index()
                );
                return Vec::new();
            }
            if let Some(cutoff) = self.cutoff()
                && seq_id < cutoff
            {
                debug!(
                    "late fragment opens stale group: seq_id={seq_id}, index={}, cutoff={cutoff}",
                    fragment.index()
                );
            }
        }

        self.highest_seen = Some(self.highest_seen.map_or(seq_id, |seen| seen.max(seq_id)));

        let mut out = Vec::new();
        if let Some(group) = self.record(fragment) {
            out.push(Disposition::Complete(group));
        }
        self.evict_stale(&mut out);
        out
    }

    /// Highest sequence id observed so far.
    #[must_use]
    pub const fn highest_seen(&self) -> Option<SeqId> { self.highest_seen }

    /// Number of open groups.
    #[must_use]
    pub fn tracked_len(&self) -> usize { self.groups.len() }

    /// Report whether a group for `seq_id` is currently open.
    #[must_use]
    pub fn is_tracking(&self, seq_id: SeqId) -> bool { self.groups.contains_key(&seq_id) }

    /// Borrow the open group for `seq_id`.
    #[must_use]
    pub fn group(&self, seq_id: SeqId) -> Option<&FragmentGroup> { self.groups.get(&seq_id) }

    /// Groups with an id strictly below this value are stale.
    fn cutoff(&self) -> Option<SeqId> {
        self.highest_seen
            .and_then(|seen| seen.checked_sub(self.tolerance))
    }

    /// Retired ids are remembered down to this value. Untracked ids below it
    /// cannot be told apart from retired ones and are dropped.
    fn horizon(&self) -> Option<SeqId> {
        self.cutoff()
            .and_then(|cutoff| cutoff.checked_sub(self.tolerance))
    }

    fn record(&mut self, fragment: Fragment) -> Option<FragmentGroup> {
        let (header, payload) = fragment.into_parts();
        let seq_id = header.seq_id();
        let block_len = self.block_len;
        let group = self
            .groups
            .entry(seq_id)
            .or_insert_with(|| FragmentGroup::new(seq_id, header.count(), block_len));

        if header.count() != group.expected_count() {
            warn!(
                "fragment count conflicts with group: seq_id={seq_id}, index={}, expected={}, \
                 found={}",
                header.index(),
                group.expected_count(),
                header.count()
            );
        }

        match group.insert(header.index(), payload) {
            InsertOutcome::Fresh => {}
            InsertOutcome::Duplicate => {
                debug!(
                    "duplicate fragment overwritten: seq_id={seq_id}, index={}",
                    header.index()
                );
            }
            InsertOutcome::OutOfRange => {
                warn!(
                    "fragment index beyond group count, payload dropped: seq_id={seq_id}, \
                     index={}, expected={}",
                    header.index(),
                    group.expected_count()
                );
            }
        }

        if !group.is_complete() {
            return None;
        }
        self.retired.insert(seq_id);
        self.groups.remove(&seq_id)
    }

    fn evict_stale(&mut self, out: &mut Vec<Disposition>) {
        let Some(cutoff) = self.cutoff() else {
            return;
        };

        let fresh = self.groups.split_off(&cutoff);
        let stale = std::mem::replace(&mut self.groups, fresh);
        for (seq_id, group) in stale {
            self.retired.insert(seq_id);
            match self.policy {
                EvictionPolicy::Pessimistic => {
                    warn!(
                        "fragment group pruned: seq_id={seq_id}, received={}/{}",
                        group.received_count(),
                        group.expected_count()
                    );
                    out.push(Disposition::Pruned {
                        seq_id,
                        received: group.received_count(),
                        expected: group.expected_count(),
                    });
                }
                EvictionPolicy::Optimistic => {
                    warn!(
                        "fragment group incomplete, dispatching partial: seq_id={seq_id}, \
                         received={}/{}",
                        group.received_count(),
                        group.expected_count()
                    );
                    out.push(Disposition::Evicted(group));
                }
            }
        }

        if let Some(horizon) = self.horizon() {
            self.retired = self.retired.split_off(&horizon);
        }
    }
}
