//! Message codecs for reconstructed buffers.
//!
//! The receiver never knows concrete message schemas. It hands each
//! reconstructed buffer to a [`MessageCodec`], which decodes zero or more
//! messages from it and splits a message into named sub-messages, one per
//! output channel.

use std::collections::HashMap;

use bytes::Bytes;

pub mod error;
pub mod fields;
pub mod raw;
pub mod schema;

pub use error::CodecError;
pub use fields::{Field, FieldMessage, FieldsCodec};
pub use raw::RawCodec;
pub use schema::{Schema, SchemaMessage};

/// Sub-messages keyed by output channel name.
pub type Decomposed = HashMap<String, Bytes>;

/// Schema-specific decoding and decomposition.
///
/// Implementations must tolerate zero-filled regions: partial groups are
/// reconstructed with zeros where fragments are missing.
pub trait MessageCodec: Send + Sync + 'static {
    /// Decoded application message.
    type Message: Send;

    /// Decode every message contained in `buffer`.
    ///
    /// An empty result means the buffer held nothing recoverable.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] when the buffer cannot be interpreted; the
    /// receiver treats this like an empty result.
    fn decode(&self, buffer: &[u8]) -> Result<Vec<Self::Message>, CodecError>;

    /// Names of every channel this schema can publish under `prefix`.
    fn channels(&self, prefix: &str) -> Vec<String>;

    /// Split `message` into sub-messages keyed by channel name.
    fn decompose(&self, message: Self::Message, prefix: &str) -> Decomposed;
}

/// Join a normalized prefix and a field name into a channel name.
///
/// # Examples
///
/// ```
/// use downlink::codec::channel_name;
/// assert_eq!(channel_name("/from_fc", "image"), "/from_fc/image");
/// assert_eq!(channel_name("", "image"), "/image");
/// ```
#[must_use]
pub fn channel_name(prefix: &str, field: &str) -> String { format!("{prefix}/{field}") }

/// Normalize an output prefix.
///
/// A missing leading `/` is added and a bare `/` collapses to the empty
/// prefix so channel names never start with `//`.
///
/// # Examples
///
/// ```
/// use downlink::codec::normalize_prefix;
/// assert_eq!(normalize_prefix("from_fc"), "/from_fc");
/// assert_eq!(normalize_prefix("/from_fc"), "/from_fc");
/// assert_eq!(normalize_prefix("/"), "");
/// ```
#[must_use]
pub fn normalize_prefix(prefix: &str) -> String {
    let prefixed = if prefix.starts_with('/') {
        prefix.to_owned()
    } else {
        format!("/{prefix}")
    };
    if prefixed == "/" { String::new() } else { prefixed }
}
