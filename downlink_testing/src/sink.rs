//! Sinks that record what a receiver emits.

use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use downlink::{
    dispatch::OutputSink,
    health::{HealthReport, HealthSink},
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Records declared channels and published payloads in arrival order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    declared: Mutex<Vec<String>>,
    published: Mutex<Vec<(String, Bytes)>>,
}

impl RecordingSink {
    /// Create an empty sink behind an [`Arc`].
    #[must_use]
    pub fn shared() -> Arc<Self> { Arc::new(Self::default()) }

    /// Channels declared so far.
    #[must_use]
    pub fn declared(&self) -> Vec<String> { lock(&self.declared).clone() }

    /// Every `(channel, payload)` published so far.
    #[must_use]
    pub fn published(&self) -> Vec<(String, Bytes)> { lock(&self.published).clone() }

    /// Payloads published on `channel`, oldest first.
    #[must_use]
    pub fn payloads(&self, channel: &str) -> Vec<Bytes> {
        lock(&self.published)
            .iter()
            .filter(|(name, _)| name == channel)
            .map(|(_, payload)| payload.clone())
            .collect()
    }
}

impl OutputSink for RecordingSink {
    fn declare(&self, channel: &str) { lock(&self.declared).push(channel.to_owned()); }

    fn publish(&self, channel: &str, payload: Bytes) {
        lock(&self.published).push((channel.to_owned(), payload));
    }
}

/// Records every health report.
#[derive(Clone, Debug, Default)]
pub struct RecordingHealth {
    reports: Arc<Mutex<Vec<HealthReport>>>,
}

impl RecordingHealth {
    /// Reports received so far.
    #[must_use]
    pub fn reports(&self) -> Vec<HealthReport> { lock(&self.reports).clone() }

    /// Most recent report.
    #[must_use]
    pub fn last(&self) -> Option<HealthReport> { lock(&self.reports).last().cloned() }
}

impl HealthSink for RecordingHealth {
    fn report(&self, report: &HealthReport) { lock(&self.reports).push(report.clone()); }
}
