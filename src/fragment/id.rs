use derive_more::{Display, From, Into};

/// Identifier shared by every fragment of one application message.
///
/// Senders assign these in increasing order for the lifetime of a session.
/// Wraparound is not supported: ordering comparisons assume the counter never
/// rolls over.
///
/// # Examples
///
/// ```
/// use downlink::fragment::SeqId;
/// let id = SeqId::new(42);
/// assert_eq!(id.get(), 42);
/// assert!(SeqId::new(41) < id);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into)]
#[display("{_0}")]
pub struct SeqId(u32);

impl SeqId {
    /// Create a new identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self { Self(value) }

    /// Return the inner numeric identifier.
    #[must_use]
    pub const fn get(self) -> u32 { self.0 }

    /// Subtract a window from this identifier, returning `None` on underflow.
    #[must_use]
    pub fn checked_sub(self, window: u32) -> Option<Self> { self.0.checked_sub(window).map(Self) }
}
