//! Error types for frame parsing and mesh reconstruction.

use thiserror::Error;

/// A datagram that is not a usable Quasar frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame truncated: need {needed} bytes, have {actual}")]
    Truncated { needed: usize, actual: usize },

    #[error("bad magic {0:02x?}")]
    BadMagic([u8; 4]),

    #[error("unknown file type {0:#04x}")]
    UnknownType(u8),
}

/// Failure inside the entropy coder.
#[derive(Debug, Error)]
pub enum EntropyError {
    #[error("entropy coder I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("decompressed payload exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

/// Failure while transforming or reconstructing mesh data.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("vertex stream of {len} scalars is not a whole number of xyz triples")]
    NotInterleaved { len: usize },

    #[error("saliency threshold {0} must be a non-negative number")]
    InvalidThreshold(f32),

    #[error("vertex payload of {len} bytes is not a whole number of f32 values")]
    MisalignedVertices { len: usize },

    #[error("index payload of {len} bytes is not a whole number of u32 values")]
    MisalignedIndices { len: usize },

    #[error("index {index} references a missing vertex (mesh has {vertex_count})")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    #[error(transparent)]
    Entropy(#[from] EntropyError),
}

pub type CodecResult<T> = Result<T, CodecError>;
