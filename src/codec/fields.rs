//! `bincode` schema carrying a list of named fields.
//!
//! A [`FieldMessage`] is the generic large-message shape: a sequence of
//! `(name, payload)` pairs, each of which becomes one output channel. The
//! set of channels is fixed by configuration so subscribers know what to
//! expect before the first message arrives.

use bincode::{Decode, Encode, config, error::EncodeError};
use bytes::Bytes;

use super::{CodecError, Decomposed, MessageCodec, channel_name};

/// Upper bound on bytes a single decode may claim.
///
/// Zero-filled gaps or corrupted length prefixes must not trigger huge
/// allocations.
pub const DECODE_LIMIT: usize = 64 * 1024 * 1024;

/// One named field of a [`FieldMessage`].
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct Field {
    /// Field name, appended to the output prefix to form the channel name.
    pub name: String,
    /// Serialized sub-message.
    pub payload: Vec<u8>,
}

/// A message composed of named sub-messages.
///
/// # Examples
///
/// ```
/// use downlink::codec::{FieldMessage, FieldsCodec, MessageCodec};
///
/// let message = FieldMessage::default()
///     .with_field("joint_state", b"\x01\x02".to_vec())
///     .with_field("image", b"jpeg".to_vec());
/// let bytes = message.to_bytes().expect("encode");
///
/// let codec = FieldsCodec::new(["joint_state", "image"]);
/// let decoded = codec.decode(&bytes).expect("decode");
/// assert_eq!(decoded, vec![message]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Encode, Decode)]
pub struct FieldMessage {
    /// Fields in sender order.
    pub fields: Vec<Field>,
}

impl FieldMessage {
    /// Append a field.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, payload: Vec<u8>) -> Self {
        self.fields.push(Field {
            name: name.into(),
            payload,
        });
        self
    }

    /// Borrow the payload of the first field called `name`.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&[u8]> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| field.payload.as_slice())
    }

    /// Encode the message with the standard `bincode` configuration.
    ///
    /// # Errors
    ///
    /// Returns an [`EncodeError`] if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        bincode::encode_to_vec(self, config::standard())
    }
}

/// Codec for [`FieldMessage`] buffers with a configured field list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldsCodec {
    fields: Vec<String>,
}

impl FieldsCodec {
    /// Create a codec exposing one channel per name in `fields`.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Field names exposed as channels.
    #[must_use]
    pub fn fields(&self) -> &[String] { &self.fields }
}

impl MessageCodec for FieldsCodec {
    type Message = FieldMessage;

    fn decode(&self, buffer: &[u8]) -> Result<Vec<Self::Message>, CodecError> {
        let (message, _consumed) = bincode::decode_from_slice(
            buffer,
            config::standard().with_limit::<DECODE_LIMIT>(),
        )?;
        Ok(vec![message])
    }

    fn channels(&self, prefix: &str) -> Vec<String> {
        self.fields
            .iter()
            .map(|field| channel_name(prefix, field))
            .collect()
    }

    fn decompose(&self, message: Self::Message, prefix: &str) -> Decomposed {
        message
            .fields
            .into_iter()
            .map(|field| (channel_name(prefix, &field.name), Bytes::from(field.payload)))
            .collect()
    }
}
