//! Sender-side helper that splits a message into wire datagrams.
//!
//! [`Fragmenter`] mirrors what the receiving side expects: every datagram is
//! exactly `packet_size` bytes, the final fragment padded with zeros, and
//! sequence ids are handed out in increasing order.

use std::num::NonZeroUsize;

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

use super::{FragmentHeader, FragmentIndex, HEADER_LEN, SeqId};

/// Errors raised while fragmenting an outbound message.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum FragmentationError {
    /// The packet size leaves no room for payload after the header.
    #[error("packet size {packet_size} leaves no room for payload after {HEADER_LEN} header bytes")]
    PacketTooSmall { packet_size: usize },
    /// The message needs more fragments than the header can count.
    #[error("message of {len} bytes needs more than u32::MAX fragments")]
    TooManyFragments { len: usize },
    /// The sequence id counter reached `u32::MAX`.
    #[error("sequence id space exhausted")]
    SeqIdExhausted,
}

/// Splits messages into fixed-size datagrams.
#[derive(Debug)]
pub struct Fragmenter {
    packet_size: usize,
    payload_len: NonZeroUsize,
    /// `None` once `u32::MAX` has been handed out.
    next_seq_id: Option<u32>,
}

impl Fragmenter {
    /// Create a fragmenter producing datagrams of `packet_size` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`FragmentationError::PacketTooSmall`] if `packet_size` does
    /// not exceed [`HEADER_LEN`].
    pub fn new(packet_size: usize) -> Result<Self, FragmentationError> {
        Self::with_starting_seq_id(packet_size, SeqId::new(0))
    }

    /// Create a fragmenter whose first message uses `start_at`.
    ///
    /// # Errors
    ///
    /// Returns [`FragmentationError::PacketTooSmall`] if `packet_size` does
    /// not exceed [`HEADER_LEN`].
    pub fn with_starting_seq_id(
        packet_size: usize,
        start_at: SeqId,
    ) -> Result<Self, FragmentationError> {
        let payload_len = NonZeroUsize::new(packet_size.saturating_sub(HEADER_LEN))
            .ok_or(FragmentationError::PacketTooSmall { packet_size })?;
        Ok(Self {
            packet_size,
            payload_len,
            next_seq_id: Some(start_at.get()),
        })
    }

    /// Payload bytes carried by each datagram.
    #[must_use]
    pub const fn payload_len(&self) -> NonZeroUsize { self.payload_len }

    /// Split `message` under the next sequence id.
    ///
    /// An empty message still produces one (all-padding) datagram.
    ///
    /// # Examples
    ///
    /// ```
    /// use downlink::fragment::{Fragment, Fragmenter, SeqId};
    ///
    /// let mut fragmenter = Fragmenter::new(16).expect("valid packet size");
    /// let (seq_id, datagrams) = fragmenter.fragment(b"hello, downlink").expect("fragment");
    /// assert_eq!(seq_id, SeqId::new(0));
    /// assert_eq!(datagrams.len(), 4);
    /// assert!(datagrams.iter().all(|d| d.len() == 16));
    /// let last = Fragment::parse(&datagrams[3]).expect("parse");
    /// assert_eq!(last.count(), 4);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`FragmentationError::SeqIdExhausted`] when called again after
    /// `u32::MAX` was handed out, and [`FragmentationError::TooManyFragments`] for messages that
    /// cannot be counted in a `u32`.
    pub fn fragment(&mut self, message: &[u8]) -> Result<(SeqId, Vec<Bytes>), FragmentationError> {
        let seq_id = self
            .next_seq_id
            .map(SeqId::new)
            .ok_or(FragmentationError::SeqIdExhausted)?;
        let datagrams = self.fragment_with_seq_id(seq_id, message)?;
        self.next_seq_id = seq_id.get().checked_add(1);
        Ok((seq_id, datagrams))
    }

    /// Split `message` under an explicit sequence id without advancing the
    /// internal counter.
    ///
    /// # Errors
    ///
    /// Returns [`FragmentationError::TooManyFragments`] for messages that
    /// cannot be counted in a `u32`.
    pub fn fragment_with_seq_id(
        &self,
        seq_id: SeqId,
        message: &[u8],
    ) -> Result<Vec<Bytes>, FragmentationError> {
        let payload_len = self.payload_len.get();
        let chunks = message.len().div_ceil(payload_len).max(1);
        let count = u32::try_from(chunks).map_err(|_| FragmentationError::TooManyFragments {
            len: message.len(),
        })?;

        let mut datagrams = Vec::with_capacity(chunks);
        for index in 0..count {
            let start = index as usize * payload_len;
            let end = (start + payload_len).min(message.len());
            let body = message.get(start..end).unwrap_or_default();

            let header = FragmentHeader::new(seq_id, FragmentIndex::new(index), count);
            let mut datagram = BytesMut::with_capacity(self.packet_size);
            datagram.put_slice(&header.to_bytes());
            datagram.put_slice(body);
            datagram.resize(self.packet_size, 0);
            datagrams.push(datagram.freeze());
        }
        Ok(datagrams)
    }
}
