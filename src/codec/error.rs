//! Errors raised by message codecs.

use bincode::error::DecodeError;
use thiserror::Error;

/// Failure to interpret a reconstructed buffer.
#[derive(Debug, Error)]
pub enum CodecError {
    /// `bincode` could not decode the buffer.
    #[error("failed to decode message: {0}")]
    Decode(#[from] DecodeError),
    /// A custom codec rejected the buffer.
    #[error("malformed message: {0}")]
    Malformed(String),
}
