//! Test-only helpers shared by unit tests.

use std::sync::{Mutex, MutexGuard, OnceLock};

use bytes::Bytes;
use logtest::Logger;
use rstest::fixture;

use crate::fragment::{Fragment, FragmentGroup, FragmentHeader, FragmentIndex, SeqId};

/// Exclusive handle to the process-wide [`logtest::Logger`].
///
/// Other tests may log concurrently, so assertions should match on record
/// content that is unique to the test rather than on record counts.
pub struct LoggerHandle {
    guard: MutexGuard<'static, Logger>,
}

impl LoggerHandle {
    /// Acquire the global logger and discard anything already captured.
    pub fn new() -> Self {
        static LOGGER: OnceLock<Mutex<Logger>> = OnceLock::new();

        let logger = LOGGER.get_or_init(|| Mutex::new(Logger::start()));
        let guard = logger
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut handle = Self { guard };
        handle.clear();
        handle
    }

    /// Drop all captured records.
    pub fn clear(&mut self) { while self.guard.pop().is_some() {} }

    /// Drain captured records as `(level, message)` pairs.
    pub fn drain(&mut self) -> Vec<(log::Level, String)> {
        let mut records = Vec::new();
        while let Some(record) = self.guard.pop() {
            records.push((record.level(), record.args().to_owned()));
        }
        records
    }

    /// Count drained records at `level` whose message contains every needle.
    pub fn count_matching(&mut self, level: log::Level, needles: &[&str]) -> usize {
        self.drain()
            .into_iter()
            .filter(|(found, message)| {
                *found == level && needles.iter().all(|needle| message.contains(needle))
            })
            .count()
    }
}

#[allow(
    unused_braces,
    reason = "rustc false positive for single line rstest fixtures"
)]
#[fixture]
pub fn logger() -> LoggerHandle { LoggerHandle::new() }

/// Build a fragment without going through the wire format.
pub fn fragment(seq_id: u32, index: u32, count: u32, payload: &[u8]) -> Fragment {
    Fragment::new(
        FragmentHeader::new(SeqId::new(seq_id), FragmentIndex::new(index), count),
        Bytes::copy_from_slice(payload),
    )
}

/// Build a group holding the given `(index, payload)` pairs.
pub fn group_with(
    seq_id: u32,
    expected_count: u32,
    block_len: usize,
    present: &[(u32, &[u8])],
) -> FragmentGroup {
    let mut group = FragmentGroup::new(SeqId::new(seq_id), expected_count, block_len);
    for (index, payload) in present {
        group.insert(FragmentIndex::new(*index), Bytes::copy_from_slice(payload));
    }
    group
}

/// Encode a fragment as it would appear on the wire.
pub fn datagram(seq_id: u32, index: u32, count: u32, payload: &[u8]) -> Vec<u8> {
    let header = FragmentHeader::new(SeqId::new(seq_id), FragmentIndex::new(index), count);
    let mut out = header.to_bytes().to_vec();
    out.extend_from_slice(payload);
    out
}

/// Output sink remembering every publication in order.
#[derive(Default)]
pub struct RecordingSink {
    declared: Mutex<Vec<String>>,
    published: Mutex<Vec<(String, Bytes)>>,
}

impl RecordingSink {
    /// Channels announced so far.
    pub fn declared(&self) -> Vec<String> {
        self.declared
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Publications so far as `(channel, payload)` pairs.
    pub fn published(&self) -> Vec<(String, Bytes)> {
        self.published
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl crate::dispatch::OutputSink for RecordingSink {
    fn declare(&self, channel: &str) {
        self.declared
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(channel.to_owned());
    }

    fn publish(&self, channel: &str, payload: Bytes) {
        self.published
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((channel.to_owned(), payload));
    }
}
