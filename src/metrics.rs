//! Metric helpers for `downlink`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. With the `metrics` feature
//! disabled every helper compiles to a no-op.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Name of the counter tracking received datagrams.
pub const DATAGRAMS_TOTAL: &str = "downlink_datagrams_total";
/// Name of the counter tracking datagrams dropped as malformed.
pub const DATAGRAMS_MALFORMED: &str = "downlink_datagrams_malformed_total";
/// Name of the counter tracking groups leaving the fragment table.
pub const GROUPS_TOTAL: &str = "downlink_groups_total";
/// Name of the counter tracking dispatch attempts.
pub const DISPATCH_TOTAL: &str = "downlink_dispatch_total";
/// Name of the counter tracking groups published out of sequence order.
pub const OUT_OF_ORDER_TOTAL: &str = "downlink_out_of_order_total";
/// Name of the gauge tracking the handoff queue depth.
pub const HANDOFF_DEPTH: &str = "downlink_handoff_depth";

/// How a group left the fragment table.
#[derive(Clone, Copy, Debug)]
pub enum GroupOutcome {
    /// All fragments arrived.
    Complete,
    /// Stale and forwarded as partial.
    Evicted,
    /// Stale and discarded.
    Pruned,
}

impl GroupOutcome {
    #[cfg_attr(not(feature = "metrics"), allow(dead_code))]
    fn as_str(self) -> &'static str {
        match self {
            GroupOutcome::Complete => "complete",
            GroupOutcome::Evicted => "evicted",
            GroupOutcome::Pruned => "pruned",
        }
    }
}

/// Result of a dispatch attempt.
#[derive(Clone, Copy, Debug)]
pub enum DispatchResult {
    /// At least one decoded message was published.
    Delivered,
    /// Nothing was published.
    Dropped,
}

impl DispatchResult {
    #[cfg_attr(not(feature = "metrics"), allow(dead_code))]
    fn as_str(self) -> &'static str {
        match self {
            DispatchResult::Delivered => "delivered",
            DispatchResult::Dropped => "dropped",
        }
    }
}

/// Record a received datagram.
pub fn inc_datagrams() {
    #[cfg(feature = "metrics")]
    counter!(DATAGRAMS_TOTAL).increment(1);
}

/// Record a datagram dropped because it could not be parsed.
pub fn inc_malformed() {
    #[cfg(feature = "metrics")]
    counter!(DATAGRAMS_MALFORMED).increment(1);
}

/// Record a group leaving the fragment table.
pub fn inc_groups(outcome: GroupOutcome) {
    #[cfg(feature = "metrics")]
    counter!(GROUPS_TOTAL, "outcome" => outcome.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = outcome;
}

/// Record a dispatch attempt.
pub fn inc_dispatch(result: DispatchResult) {
    #[cfg(feature = "metrics")]
    counter!(DISPATCH_TOTAL, "result" => result.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = result;
}

/// Record a group published after a newer one.
pub fn inc_out_of_order() {
    #[cfg(feature = "metrics")]
    counter!(OUT_OF_ORDER_TOTAL).increment(1);
}

/// Publish the current handoff queue depth.
#[expect(
    clippy::cast_precision_loss,
    reason = "gauge values are f64; queue depths stay far below 2^52"
)]
pub fn set_handoff_depth(depth: usize) {
    #[cfg(feature = "metrics")]
    gauge!(HANDOFF_DEPTH).set(depth as f64);
    #[cfg(not(feature = "metrics"))]
    let _ = depth as f64;
}
