//! Vertex payload packing.

use crate::error::{CodecError, CodecResult};

/// Pack vertex scalars as little-endian `f32` bytes.
#[must_use]
pub fn encode_vertices(vertices: &[f32]) -> Vec<u8> {
    vertices.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Unpack a little-endian `f32` payload.
///
/// Input format: 4*N bytes, one IEEE 754 single per scalar, in vertex order.
pub fn decode_vertices(packed: &[u8]) -> CodecResult<Vec<f32>> {
    if packed.len() % 4 != 0 {
        return Err(CodecError::MisalignedVertices { len: packed.len() });
    }
    Ok(packed
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}
