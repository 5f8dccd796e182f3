//! Compress mesh components into self-describing Quasar frames.
//!
//! This crate provides pure synchronous encoding and decoding functions for
//! the Quasar spatial wire format. Nothing here touches a socket or a file;
//! the transport and the scene loader live in other crates.
//!
//! # Design principles
//!
//! - **Synchronous**: No async, no threading primitives
//! - **Borrowing parser**: [`parse_frame`] never allocates and never reads
//!   past the end of its input
//! - **Narrow seams**: the wavelet and the entropy coder are traits, so
//!   callers can swap them for deterministic fakes
//!
//! # Key functions
//!
//! - [`PlanarCodec::forward`]: Per-plane wavelet transform plus saliency filter
//! - [`PlanarCodec::inverse`]: Per-plane inverse transform
//! - [`build_frame`]: Serialize a header and two payloads into one frame
//! - [`parse_frame`]: Split a datagram back into header and payload slices
//! - [`encode_vertices`] / [`decode_vertices`]: Little-endian `f32` payloads
//! - [`encode_indices`] / [`decode_indices`]: Little-endian `u32` payloads

mod error;

pub mod entropy;
pub mod frame;
pub mod indices;
pub mod planar;
pub mod vertices;
pub mod wavelet;

pub use entropy::{DeflateCodec, EntropyCodec, Passthrough};
pub use error::{CodecError, CodecResult, EntropyError, FrameError};
pub use frame::{
    CompressionFlags, DEFAULT_SCALE, FILE_TYPE_MESH, FrameHeader, FrameView, HEADER_SIZE, MAGIC,
    build_frame, parse_frame,
};
pub use indices::{check_indices, decode_indices, encode_indices};
pub use planar::{PlanarCodec, saliency_filter};
pub use vertices::{decode_vertices, encode_vertices};
pub use wavelet::{HaarTransform, WaveletTransform};

/// Number of scalars per vertex position.
pub const COMPONENTS_PER_VERTEX: usize = 3;

/// One named mesh extracted from a scene.
///
/// `vertices` is interleaved `x, y, z` per vertex and `indices` names
/// triangles by vertex position. Index values are not checked against the
/// vertex count here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Component {
    /// Display name from the source scene. Frames carry a numeric id instead.
    pub name: String,
    /// Interleaved vertex positions.
    pub vertices: Vec<f32>,
    /// Triangle list indices.
    pub indices: Vec<u32>,
}

impl Component {
    #[must_use]
    pub fn new(name: impl Into<String>, vertices: Vec<f32>, indices: Vec<u32>) -> Self {
        Self {
            name: name.into(),
            vertices,
            indices,
        }
    }

    /// Number of whole vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / COMPONENTS_PER_VERTEX
    }

    /// Number of whole triangles.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// True when the component has neither vertices nor indices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.indices.is_empty()
    }

    /// Size in bytes of the uncompressed vertex and index payloads.
    #[must_use]
    pub fn raw_size(&self) -> usize {
        (self.vertices.len() + self.indices.len()) * 4
    }
}
