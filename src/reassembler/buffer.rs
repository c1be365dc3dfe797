//! Gap-filling reconstruction of a fragment group into one buffer.

use bytes::{Bytes, BytesMut};
use thiserror::Error;

use crate::fragment::{FragmentGroup, SeqId};

/// Largest buffer [`reconstruct`] will allocate.
///
/// A corrupted `count` on a group that is later evicted would otherwise ask
/// for terabytes.
pub const MAX_RECONSTRUCTED_LEN: usize = 256 * 1024 * 1024;

/// Raised when a group's declared size exceeds [`MAX_RECONSTRUCTED_LEN`].
#[derive(Debug, Error, PartialEq, Eq)]
#[error(
    "reconstructed buffer too large: seq_id={seq_id}, count={expected_count}, \
     block_len={block_len}"
)]
pub struct ReconstructError {
    /// Group that was rejected.
    pub seq_id: SeqId,
    /// Declared fragment count.
    pub expected_count: u32,
    /// Per-fragment block length.
    pub block_len: usize,
}

/// Concatenate a group's payloads in index order.
///
/// The result is exactly `expected_count × block_len` bytes. Block `i` holds
/// the payload of fragment `i`, zero-padded or truncated to `block_len`, and
/// is all zeros when fragment `i` never arrived.
///
/// # Errors
///
/// Returns [`ReconstructError`] when the buffer would exceed
/// [`MAX_RECONSTRUCTED_LEN`].
pub fn reconstruct(group: &FragmentGroup) -> Result<Bytes, ReconstructError> {
    let block_len = group.block_len();
    let total = usize::try_from(group.expected_count())
        .ok()
        .and_then(|count| count.checked_mul(block_len))
        .filter(|total| *total <= MAX_RECONSTRUCTED_LEN)
        .ok_or(ReconstructError {
            seq_id: group.seq_id(),
            expected_count: group.expected_count(),
            block_len,
        })?;

    let mut buffer = BytesMut::zeroed(total);
    for (index, payload) in group.iter() {
        let start = index.as_usize() * block_len;
        let len = payload.len().min(block_len);
        buffer[start..start + len].copy_from_slice(&payload[..len]);
    }
    Ok(buffer.freeze())
}
