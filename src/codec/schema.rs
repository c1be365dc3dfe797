//! Resolution of the configured message type to a built-in codec.

use bytes::Bytes;

use super::{CodecError, Decomposed, FieldMessage, FieldsCodec, MessageCodec, RawCodec};
use crate::config::ConfigError;

/// Name of the raw-buffer schema.
pub const RAW: &str = "raw";
/// Name of the named-fields schema.
pub const FIELDS: &str = "fields";
/// Every schema name [`Schema::resolve`] accepts.
pub const KNOWN: &[&str] = &[RAW, FIELDS];

/// A built-in schema selected by name.
#[derive(Clone, Debug)]
pub enum Schema {
    /// See [`RawCodec`].
    Raw(RawCodec),
    /// See [`FieldsCodec`].
    Fields(FieldsCodec),
}

/// Message decoded by a [`Schema`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SchemaMessage {
    /// Whole reconstructed buffer.
    Raw(Bytes),
    /// Decoded field list.
    Fields(FieldMessage),
}

impl Schema {
    /// Look up the schema called `message_type`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownMessageType`] for unregistered names and
    /// [`ConfigError::MissingFields`] when `fields` is selected without any
    /// field names.
    ///
    /// # Examples
    ///
    /// ```
    /// use downlink::codec::{MessageCodec, Schema};
    ///
    /// let schema = Schema::resolve("raw", &[]).expect("known schema");
    /// assert_eq!(schema.channels("/from_fc"), vec!["/from_fc/data".to_owned()]);
    /// assert!(Schema::resolve("jpeg", &[]).is_err());
    /// ```
    pub fn resolve(message_type: &str, fields: &[String]) -> Result<Self, ConfigError> {
        match message_type {
            RAW => Ok(Self::Raw(RawCodec)),
            FIELDS if fields.is_empty() => Err(ConfigError::MissingFields {
                message_type: message_type.to_owned(),
            }),
            FIELDS => Ok(Self::Fields(FieldsCodec::new(fields.iter().cloned()))),
            other => Err(ConfigError::UnknownMessageType {
                message_type: other.to_owned(),
                known: KNOWN,
            }),
        }
    }

    /// Registered name of this schema.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Raw(_) => RAW,
            Self::Fields(_) => FIELDS,
        }
    }
}

impl MessageCodec for Schema {
    type Message = SchemaMessage;

    fn decode(&self, buffer: &[u8]) -> Result<Vec<Self::Message>, CodecError> {
        Ok(match self {
            Self::Raw(codec) => codec
                .decode(buffer)?
                .into_iter()
                .map(SchemaMessage::Raw)
                .collect(),
            Self::Fields(codec) => codec
                .decode(buffer)?
                .into_iter()
                .map(SchemaMessage::Fields)
                .collect(),
        })
    }

    fn channels(&self, prefix: &str) -> Vec<String> {
        match self {
            Self::Raw(codec) => codec.channels(prefix),
            Self::Fields(codec) => codec.channels(prefix),
        }
    }

    fn decompose(&self, message: Self::Message, prefix: &str) -> Decomposed {
        match (self, message) {
            (Self::Raw(codec), SchemaMessage::Raw(bytes)) => codec.decompose(bytes, prefix),
            (Self::Fields(codec), SchemaMessage::Fields(fields)) => {
                codec.decompose(fields, prefix)
            }
            (schema, _) => {
                log::warn!(
                    "message does not belong to schema, nothing decomposed: schema={}",
                    schema.name()
                );
                Decomposed::new()
            }
        }
    }
}
