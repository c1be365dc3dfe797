//! Pass-through schema publishing the reconstructed buffer as is.

use bytes::Bytes;

use super::{CodecError, Decomposed, MessageCodec, channel_name};

/// Field name under which [`RawCodec`] publishes the whole buffer.
pub const RAW_FIELD: &str = "data";

/// Schema that treats the reconstructed buffer itself as the message.
///
/// Every group yields exactly one message, published on `<prefix>/data`
/// including any zero-filled gaps.
#[derive(Clone, Copy, Debug, Default)]
pub struct RawCodec;

impl MessageCodec for RawCodec {
    type Message = Bytes;

    fn decode(&self, buffer: &[u8]) -> Result<Vec<Self::Message>, CodecError> {
        Ok(vec![Bytes::copy_from_slice(buffer)])
    }

    fn channels(&self, prefix: &str) -> Vec<String> { vec![channel_name(prefix, RAW_FIELD)] }

    fn decompose(&self, message: Self::Message, prefix: &str) -> Decomposed {
        Decomposed::from([(channel_name(prefix, RAW_FIELD), message)])
    }
}
