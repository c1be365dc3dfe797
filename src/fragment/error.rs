//! Error types emitted while decoding datagrams into fragments.

use thiserror::Error;

use super::SeqId;

/// Reasons a datagram could not be turned into a [`Fragment`](super::Fragment).
///
/// None of these are fatal: the listener drops the datagram and keeps going.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The datagram cannot hold a complete header.
    #[error("datagram too short for fragment header: len={len}")]
    TooShort { len: usize },
    /// The header declares a message with no fragments.
    #[error("fragment declares zero count: seq_id={seq_id}")]
    ZeroCount { seq_id: SeqId },
    /// The fragment index lies outside the declared count.
    #[error("fragment index out of range: seq_id={seq_id}, index={index}, count={count}")]
    IndexOutOfRange { seq_id: SeqId, index: u32, count: u32 },
}
