//! Planar transform codec for interleaved vertex streams.
//!
//! The wavelet runs on each coordinate plane separately. Transforming the
//! interleaved stream directly would mix one vertex's X into its
//! neighbour's Y.

use crate::COMPONENTS_PER_VERTEX;
use crate::error::{CodecError, CodecResult};
use crate::wavelet::{HaarTransform, WaveletTransform};

/// Applies a [`WaveletTransform`] to the X, Y and Z planes of a vertex stream.
#[derive(Debug, Clone, Default)]
pub struct PlanarCodec<W = HaarTransform> {
    transform: W,
}

impl<W: WaveletTransform> PlanarCodec<W> {
    #[must_use]
    pub fn new(transform: W) -> Self {
        Self { transform }
    }

    #[must_use]
    pub fn transform(&self) -> &W {
        &self.transform
    }

    /// Transform `vertices` in place and zero coefficients below `threshold`.
    ///
    /// # Arguments
    ///
    /// * `vertices` - Interleaved `x, y, z` scalars, length a multiple of 3
    /// * `threshold` - Saliency threshold, `0.0` keeps every coefficient
    ///
    /// The saliency filter is lossy: [`PlanarCodec::inverse`] cannot restore
    /// coefficients it zeroed.
    pub fn forward(&self, vertices: &mut [f32], threshold: f32) -> CodecResult<()> {
        check_threshold(threshold)?;
        let mut planes = split_planes(vertices)?;
        for plane in &mut planes {
            self.transform.forward(plane);
            saliency_filter(plane, threshold);
        }
        merge_planes(&planes, vertices);
        Ok(())
    }

    /// Undo the wavelet transform on `vertices` in place.
    pub fn inverse(&self, vertices: &mut [f32]) -> CodecResult<()> {
        let mut planes = split_planes(vertices)?;
        for plane in &mut planes {
            self.transform.inverse(plane);
        }
        merge_planes(&planes, vertices);
        Ok(())
    }
}

/// Zero every coefficient whose magnitude is below `threshold`.
pub fn saliency_filter(plane: &mut [f32], threshold: f32) {
    for value in plane.iter_mut().filter(|v| v.abs() < threshold) {
        *value = 0.0;
    }
}

fn check_threshold(threshold: f32) -> CodecResult<()> {
    if threshold.is_nan() || threshold < 0.0 {
        return Err(CodecError::InvalidThreshold(threshold));
    }
    Ok(())
}

fn split_planes(vertices: &[f32]) -> CodecResult<[Vec<f32>; COMPONENTS_PER_VERTEX]> {
    if vertices.len() % COMPONENTS_PER_VERTEX != 0 {
        return Err(CodecError::NotInterleaved {
            len: vertices.len(),
        });
    }
    let count = vertices.len() / COMPONENTS_PER_VERTEX;
    let mut planes: [Vec<f32>; COMPONENTS_PER_VERTEX] =
        std::array::from_fn(|_| Vec::with_capacity(count));
    for xyz in vertices.chunks_exact(COMPONENTS_PER_VERTEX) {
        for (plane, &value) in planes.iter_mut().zip(xyz) {
            plane.push(value);
        }
    }
    Ok(planes)
}

fn merge_planes(planes: &[Vec<f32>; COMPONENTS_PER_VERTEX], vertices: &mut [f32]) {
    for (i, xyz) in vertices.chunks_exact_mut(COMPONENTS_PER_VERTEX).enumerate() {
        for (value, plane) in xyz.iter_mut().zip(planes) {
            *value = plane[i];
        }
    }
}
