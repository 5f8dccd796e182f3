//! Entropy coding for index payloads.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;

use crate::error::EntropyError;

/// Opaque byte-level compressor.
pub trait EntropyCodec {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, EntropyError>;

    /// Decompress `data`, failing once the output would exceed `limit` bytes.
    fn decompress(&self, data: &[u8], limit: usize) -> Result<Vec<u8>, EntropyError>;

    /// True when `compress` returns its input unchanged. Frames built with
    /// such a coder go out with the entropy flag cleared.
    fn is_identity(&self) -> bool {
        false
    }
}

impl<T: EntropyCodec + ?Sized> EntropyCodec for &T {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, EntropyError> {
        (**self).compress(data)
    }

    fn decompress(&self, data: &[u8], limit: usize) -> Result<Vec<u8>, EntropyError> {
        (**self).decompress(data, limit)
    }

    fn is_identity(&self) -> bool {
        (**self).is_identity()
    }
}

/// Raw DEFLATE stream (no zlib or gzip wrapper).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeflateCodec {
    /// Compression level, 0 (store) to 9 (best).
    pub level: u32,
}

impl Default for DeflateCodec {
    fn default() -> Self {
        Self { level: 6 }
    }
}

impl EntropyCodec for DeflateCodec {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, EntropyError> {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::new(self.level.min(9)));
        encoder.write_all(data)?;
        Ok(encoder.finish()?)
    }

    fn decompress(&self, data: &[u8], limit: usize) -> Result<Vec<u8>, EntropyError> {
        // A zero-length blob is a component without triangles.
        if data.is_empty() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        DeflateDecoder::new(data)
            .take(u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1))
            .read_to_end(&mut out)?;
        if out.len() > limit {
            return Err(EntropyError::TooLarge { limit });
        }
        Ok(out)
    }
}

/// Identity coder, for links where the index payload is sent raw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Passthrough;

impl EntropyCodec for Passthrough {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, EntropyError> {
        Ok(data.to_vec())
    }

    fn decompress(&self, data: &[u8], limit: usize) -> Result<Vec<u8>, EntropyError> {
        if data.len() > limit {
            return Err(EntropyError::TooLarge { limit });
        }
        Ok(data.to_vec())
    }

    fn is_identity(&self) -> bool {
        true
    }
}
