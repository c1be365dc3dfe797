#![cfg(feature = "metrics")]
//! Tests for `downlink` metrics helpers.
//!
//! These tests verify that counters and gauges update as expected using
//! `metrics_util::debugging::DebuggingRecorder`.

use downlink::{
    fragment::{EvictionPolicy, FragmentTable},
    handoff::handoff_queue,
    listener::Listener,
    metrics::{self as downlink_metrics, DispatchResult, GroupOutcome},
};
use downlink_testing::{TestResult, counter_value, debugging_recorder};
use metrics_util::debugging::DebugValue;
use rstest::rstest;
use tokio::net::UdpSocket;

#[test]
fn datagram_counters_increment() {
    let (snapshotter, recorder) = debugging_recorder();
    metrics::with_local_recorder(&recorder, || {
        downlink_metrics::inc_datagrams();
        downlink_metrics::inc_datagrams();
        downlink_metrics::inc_malformed();
    });

    assert_eq!(
        counter_value(&snapshotter, downlink_metrics::DATAGRAMS_TOTAL, None),
        2
    );
    assert_eq!(
        counter_value(&snapshotter, downlink_metrics::DATAGRAMS_MALFORMED, None),
        1
    );
}

#[rstest]
#[case(GroupOutcome::Complete, "complete")]
#[case(GroupOutcome::Evicted, "evicted")]
#[case(GroupOutcome::Pruned, "pruned")]
fn group_outcomes_are_labelled(#[case] outcome: GroupOutcome, #[case] label: &str) {
    let (snapshotter, recorder) = debugging_recorder();
    metrics::with_local_recorder(&recorder, || downlink_metrics::inc_groups(outcome));

    assert_eq!(
        counter_value(
            &snapshotter,
            downlink_metrics::GROUPS_TOTAL,
            Some(("outcome", label))
        ),
        1
    );
}

#[rstest]
#[case(DispatchResult::Delivered, "delivered")]
#[case(DispatchResult::Dropped, "dropped")]
fn dispatch_results_are_labelled(#[case] result: DispatchResult, #[case] label: &str) {
    let (snapshotter, recorder) = debugging_recorder();
    metrics::with_local_recorder(&recorder, || downlink_metrics::inc_dispatch(result));

    assert_eq!(
        counter_value(
            &snapshotter,
            downlink_metrics::DISPATCH_TOTAL,
            Some(("result", label))
        ),
        1
    );
}

#[test]
fn handoff_depth_gauge_reports_latest_value() {
    let (snapshotter, recorder) = debugging_recorder();
    metrics::with_local_recorder(&recorder, || {
        downlink_metrics::set_handoff_depth(7);
        downlink_metrics::set_handoff_depth(3);
    });

    let metrics = snapshotter.snapshot().into_vec();
    let found = metrics.iter().any(|(k, _, _, v)| {
        k.key().name() == downlink_metrics::HANDOFF_DEPTH
            && matches!(v, DebugValue::Gauge(g) if (g.into_inner() - 3.0).abs() < f64::EPSILON)
    });
    assert!(found, "handoff depth gauge not recorded");
}

#[tokio::test]
async fn listener_counts_datagrams_and_group_outcomes() -> TestResult {
    let socket = UdpSocket::bind("127.0.0.1:0").await?;
    let (queue, _rx) = handoff_queue();
    let table = FragmentTable::new(4, 1, EvictionPolicy::Pessimistic);
    let mut listener = Listener::new(socket, table, queue, 16);

    let mut complete = vec![0, 0, 0, 5, 0, 0, 0, 0, 0, 0, 0, 1];
    complete.extend_from_slice(b"done");
    let mut partial = vec![0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 2];
    partial.extend_from_slice(b"half");

    let (snapshotter, recorder) = debugging_recorder();
    metrics::with_local_recorder(&recorder, || -> TestResult {
        listener.ingest(&partial)?;
        listener.ingest(b"tiny")?;
        listener.ingest(&complete)?;
        Ok(())
    })?;

    assert_eq!(
        counter_value(&snapshotter, downlink_metrics::DATAGRAMS_TOTAL, None),
        3
    );
    assert_eq!(
        counter_value(&snapshotter, downlink_metrics::DATAGRAMS_MALFORMED, None),
        1
    );
    assert_eq!(
        counter_value(
            &snapshotter,
            downlink_metrics::GROUPS_TOTAL,
            Some(("outcome", "complete"))
        ),
        1
    );
    assert_eq!(
        counter_value(
            &snapshotter,
            downlink_metrics::GROUPS_TOTAL,
            Some(("outcome", "pruned"))
        ),
        1
    );
    Ok(())
}
