//! Liveness bookkeeping and the periodic health report.
//!
//! The reassembler writes to an [`Activity`] after every group; the
//! [`HealthReporter`] reads it on its own schedule. The two run in separate
//! tasks, so the shared region sits behind a mutex and is only ever held for
//! a copy.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use bytes::Bytes;
use serde::Serialize;
use tokio::{
    select,
    time::{MissedTickBehavior, interval},
};
use tokio_util::sync::CancellationToken;

use crate::dispatch::OutputSink;

/// Channel carrying the time of the last dispatched group.
pub const LAST_RECEIVED_TIME: &str = "last_received_time";

#[derive(Debug)]
struct ActivityState {
    launched: Instant,
    last_received: Option<(Instant, SystemTime)>,
    delivered: u64,
    dropped: u64,
    out_of_order: u64,
}

/// Shared record of reassembler activity.
///
/// Cloning yields another handle to the same region.
#[derive(Clone, Debug)]
pub struct Activity {
    inner: Arc<Mutex<ActivityState>>,
}

/// Point-in-time copy of an [`Activity`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActivitySnapshot {
    /// Time since the activity record was created.
    pub uptime: Duration,
    /// Time since the last group was processed, if any was.
    pub since_last_input: Option<Duration>,
    /// Wall-clock time of the last processed group.
    pub last_received: Option<SystemTime>,
    /// Groups that produced output.
    pub delivered: u64,
    /// Groups that produced no output.
    pub dropped: u64,
    /// Groups processed after a newer one.
    pub out_of_order: u64,
}

impl Default for Activity {
    fn default() -> Self { Self::new() }
}

impl Activity {
    /// Start a record; uptime counts from now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ActivityState {
                launched: Instant::now(),
                last_received: None,
                delivered: 0,
                dropped: 0,
                out_of_order: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ActivityState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Note a group whose decoded message was published.
    pub fn record_delivered(&self) {
        let mut state = self.lock();
        state.delivered += 1;
        state.last_received = Some((Instant::now(), SystemTime::now()));
    }

    /// Note a group that was processed without output.
    pub fn record_dropped(&self) {
        let mut state = self.lock();
        state.dropped += 1;
        state.last_received = Some((Instant::now(), SystemTime::now()));
    }

    /// Note a group that arrived after a newer one had been published.
    pub fn record_out_of_order(&self) { self.lock().out_of_order += 1; }

    /// Copy the current state.
    #[must_use]
    pub fn snapshot(&self) -> ActivitySnapshot {
        let state = self.lock();
        ActivitySnapshot {
            uptime: state.launched.elapsed(),
            since_last_input: state.last_received.map(|(at, _)| at.elapsed()),
            last_received: state.last_received.map(|(_, wall)| wall),
            delivered: state.delivered,
            dropped: state.dropped,
            out_of_order: state.out_of_order,
        }
    }
}

/// Overall receiver status.
///
/// The receiver has no failure state of its own: a silent link is reported
/// through `since_last_input`, not through the status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum HealthStatus {
    /// Running.
    Ok,
}

/// One periodic status report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    /// Always [`HealthStatus::Ok`].
    pub status: HealthStatus,
    /// Time since the receiver started.
    pub uptime: Duration,
    /// Time since the last group was processed.
    pub since_last_input: Option<Duration>,
    /// Configured receive address.
    pub address: String,
    /// Configured receive port.
    pub port: u16,
    /// Groups that produced output.
    pub delivered: u64,
    /// Groups that produced no output.
    pub dropped: u64,
    /// Groups processed after a newer one.
    pub out_of_order: u64,
}

/// Destination for [`HealthReport`]s.
pub trait HealthSink: Send + Sync + 'static {
    /// Consume one report.
    fn report(&self, report: &HealthReport);
}

/// Emits reports as debug-level structured events.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogHealthSink;

impl HealthSink for LogHealthSink {
    fn report(&self, report: &HealthReport) {
        tracing::debug!(
            status = ?report.status,
            uptime_secs = report.uptime.as_secs_f64(),
            since_last_input_secs = ?report.since_last_input.map(|d| d.as_secs_f64()),
            address = %report.address,
            port = report.port,
            delivered = report.delivered,
            dropped = report.dropped,
            out_of_order = report.out_of_order,
            "health report"
        );
    }
}

/// Encode the last-receipt time as big-endian milliseconds since the Unix
/// epoch, or zero when nothing has been received.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, UNIX_EPOCH};
///
/// use downlink::health::encode_timestamp;
///
/// assert_eq!(&encode_timestamp(None)[..], &[0; 8]);
/// let at = UNIX_EPOCH + Duration::from_millis(0x0102);
/// assert_eq!(&encode_timestamp(Some(at))[..], &[0, 0, 0, 0, 0, 0, 1, 2]);
/// ```
#[must_use]
pub fn encode_timestamp(at: Option<SystemTime>) -> Bytes {
    let millis = at
        .and_then(|at| at.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |since| u64::try_from(since.as_millis()).unwrap_or(u64::MAX));
    Bytes::copy_from_slice(&millis.to_be_bytes())
}

/// Periodically reports [`Activity`] to a [`HealthSink`] and publishes the
/// last-receipt time.
pub struct HealthReporter {
    activity: Activity,
    sink: Arc<dyn HealthSink>,
    output: Arc<dyn OutputSink>,
    address: String,
    port: u16,
    period: Duration,
}

impl HealthReporter {
    /// Create a reporter ticking every `period`.
    #[must_use]
    pub fn new(
        activity: Activity,
        sink: Arc<dyn HealthSink>,
        output: Arc<dyn OutputSink>,
        address: impl Into<String>,
        port: u16,
        period: Duration,
    ) -> Self {
        Self {
            activity,
            sink,
            output,
            address: address.into(),
            port,
            period,
        }
    }

    /// Build a report from the current activity.
    #[must_use]
    pub fn report(&self) -> HealthReport {
        let snapshot = self.activity.snapshot();
        HealthReport {
            status: HealthStatus::Ok,
            uptime: snapshot.uptime,
            since_last_input: snapshot.since_last_input,
            address: self.address.clone(),
            port: self.port,
            delivered: snapshot.delivered,
            dropped: snapshot.dropped,
            out_of_order: snapshot.out_of_order,
        }
    }

    /// Emit one report and publish the last-receipt time.
    pub fn tick(&self) {
        self.sink.report(&self.report());
        let last_received = self.activity.snapshot().last_received;
        self.output
            .publish(LAST_RECEIVED_TIME, encode_timestamp(last_received));
    }

    /// Tick every period until `shutdown` is cancelled.
    #[expect(
        clippy::integer_division_remainder_used,
        reason = "tokio::select! expands to modulus internally"
    )]
    pub async fn run(self, shutdown: CancellationToken) {
        self.output.declare(LAST_RECEIVED_TIME);
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            select! {
                biased;

                () = shutdown.cancelled() => break,
                _ = ticker.tick() => self.tick(),
            }
        }
        tracing::debug!("health reporter stopped");
    }
}
