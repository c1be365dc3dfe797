//! Parsed datagrams.

use bytes::Bytes;

use super::{FragmentHeader, FragmentIndex, HEADER_LEN, ParseError, SeqId};

/// One received datagram split into header and payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fragment {
    header: FragmentHeader,
    payload: Bytes,
}

impl Fragment {
    /// Assemble a fragment from an already validated header.
    #[must_use]
    pub fn new(header: FragmentHeader, payload: impl Into<Bytes>) -> Self {
        Self {
            header,
            payload: payload.into(),
        }
    }

    /// Parse a raw datagram, copying its payload.
    ///
    /// # Examples
    ///
    /// ```
    /// use downlink::fragment::{Fragment, FragmentHeader, FragmentIndex, SeqId};
    /// let header = FragmentHeader::new(SeqId::new(3), FragmentIndex::zero(), 1);
    /// let mut datagram = header.to_bytes().to_vec();
    /// datagram.extend_from_slice(b"abc");
    /// let fragment = Fragment::parse(&datagram).expect("valid datagram");
    /// assert_eq!(fragment.seq_id(), SeqId::new(3));
    /// assert_eq!(fragment.payload().as_ref(), b"abc");
    /// ```
    ///
    /// # Errors
    ///
    /// Propagates any [`ParseError`] raised by [`FragmentHeader::parse`].
    pub fn parse(datagram: &[u8]) -> Result<Self, ParseError> {
        let header = FragmentHeader::parse(datagram)?;
        let payload = Bytes::copy_from_slice(&datagram[HEADER_LEN..]);
        Ok(Self { header, payload })
    }

    /// Return the parsed header.
    #[must_use]
    pub const fn header(&self) -> FragmentHeader { self.header }

    /// Return the message identifier.
    #[must_use]
    pub const fn seq_id(&self) -> SeqId { self.header.seq_id() }

    /// Return the fragment position.
    #[must_use]
    pub const fn index(&self) -> FragmentIndex { self.header.index() }

    /// Return the declared fragment count.
    #[must_use]
    pub const fn count(&self) -> u32 { self.header.count() }

    /// Borrow the payload bytes.
    #[must_use]
    pub fn payload(&self) -> &Bytes { &self.payload }

    /// Consume the fragment, returning its header and payload.
    #[must_use]
    pub fn into_parts(self) -> (FragmentHeader, Bytes) { (self.header, self.payload) }
}
