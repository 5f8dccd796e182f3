//! Index payload packing.

use crate::error::{CodecError, CodecResult};

/// Pack triangle indices as little-endian `u32` bytes.
#[must_use]
pub fn encode_indices(indices: &[u32]) -> Vec<u8> {
    indices.iter().flat_map(|i| i.to_le_bytes()).collect()
}

/// Reinterpret decompressed bytes as little-endian `u32` indices.
///
/// Fails with [`CodecError::MisalignedIndices`] when the byte length is not
/// a multiple of 4, which happens when a frame was cut short or corrupted
/// before the entropy coder saw it.
pub fn decode_indices(packed: &[u8]) -> CodecResult<Vec<u32>> {
    if packed.len() % 4 != 0 {
        return Err(CodecError::MisalignedIndices { len: packed.len() });
    }
    Ok(packed
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Check that every index names an existing vertex.
pub fn check_indices(indices: &[u32], vertex_count: usize) -> CodecResult<()> {
    match indices
        .iter()
        .find(|&&i| !usize::try_from(i).is_ok_and(|i| i < vertex_count))
    {
        Some(&index) => Err(CodecError::IndexOutOfRange {
            index,
            vertex_count,
        }),
        None => Ok(()),
    }
}
