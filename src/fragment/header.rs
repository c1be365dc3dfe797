use super::{FragmentIndex, ParseError, SeqId};

/// Encoded size of a [`FragmentHeader`] on the wire.
pub const HEADER_LEN: usize = 12;

/// Fixed-width header carried at the start of every datagram.
///
/// The layout is three big-endian `u32` values: sequence id, fragment index
/// and fragment count.
///
/// # Examples
///
/// ```
/// use downlink::fragment::{FragmentHeader, FragmentIndex, SeqId};
/// let header = FragmentHeader::new(SeqId::new(7), FragmentIndex::new(1), 4);
/// let bytes = header.to_bytes();
/// assert_eq!(FragmentHeader::parse(&bytes), Ok(header));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FragmentHeader {
    seq_id: SeqId,
    index: FragmentIndex,
    count: u32,
}

impl FragmentHeader {
    /// Create a new fragment header.
    #[must_use]
    pub const fn new(seq_id: SeqId, index: FragmentIndex, count: u32) -> Self {
        Self {
            seq_id,
            index,
            count,
        }
    }

    /// Return the message identifier.
    #[must_use]
    pub const fn seq_id(&self) -> SeqId { self.seq_id }

    /// Return the fragment position within the message.
    #[must_use]
    pub const fn index(&self) -> FragmentIndex { self.index }

    /// Return the total number of fragments declared for the message.
    #[must_use]
    pub const fn count(&self) -> u32 { self.count }

    /// Parse and validate the header at the start of `datagram`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::TooShort`] when fewer than [`HEADER_LEN`] bytes
    /// are available, [`ParseError::ZeroCount`] when the declared count is
    /// zero, and [`ParseError::IndexOutOfRange`] when the index does not fall
    /// inside `0..count`.
    pub fn parse(datagram: &[u8]) -> Result<Self, ParseError> {
        let Some(raw) = datagram.first_chunk::<HEADER_LEN>() else {
            return Err(ParseError::TooShort {
                len: datagram.len(),
            });
        };
        let field = |at: usize| u32::from_be_bytes([raw[at], raw[at + 1], raw[at + 2], raw[at + 3]]);
        let seq_id = SeqId::new(field(0));
        let index = field(4);
        let count = field(8);

        if count == 0 {
            return Err(ParseError::ZeroCount { seq_id });
        }
        if index >= count {
            return Err(ParseError::IndexOutOfRange {
                seq_id,
                index,
                count,
            });
        }
        Ok(Self::new(seq_id, FragmentIndex::new(index), count))
    }

    /// Encode the header into its wire representation.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0_u8; HEADER_LEN];
        out[0..4].copy_from_slice(&self.seq_id.get().to_be_bytes());
        out[4..8].copy_from_slice(&self.index.get().to_be_bytes());
        out[8..12].copy_from_slice(&self.count.to_be_bytes());
        out
    }
}
