//! Elementary one-dimensional wavelet transforms.

/// An in-place transform over one scalar plane.
///
/// Implementations must accept any plane length, including zero and
/// lengths that are not a power of two, without padding or truncating.
pub trait WaveletTransform {
    fn forward(&self, plane: &mut [f32]);
    fn inverse(&self, plane: &mut [f32]);
}

impl<T: WaveletTransform + ?Sized> WaveletTransform for &T {
    fn forward(&self, plane: &mut [f32]) {
        (**self).forward(plane);
    }

    fn inverse(&self, plane: &mut [f32]) {
        (**self).inverse(plane);
    }
}

/// Haar wavelet using pairwise averages and half-differences.
///
/// # Layout
///
/// One level turns a band of `n` samples into `n / 2` averages followed by
/// `n / 2` details. When `n` is odd the last sample is carried through
/// unchanged at the end of the band. Each additional level recurses into
/// the averages.
///
/// ```text
/// [a, b, c, d, e] -> [(a+b)/2, (c+d)/2, (a-b)/2, (c-d)/2, e]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HaarTransform {
    /// Number of decomposition levels. Zero leaves planes untouched.
    pub levels: usize,
}

impl Default for HaarTransform {
    fn default() -> Self {
        Self { levels: 1 }
    }
}

impl HaarTransform {
    #[must_use]
    pub fn with_levels(levels: usize) -> Self {
        Self { levels }
    }

    /// Band lengths visited by the forward pass, outermost first.
    fn bands(&self, len: usize) -> Vec<usize> {
        let mut bands = Vec::new();
        let mut band = len;
        while bands.len() < self.levels && band >= 2 {
            bands.push(band);
            band /= 2;
        }
        bands
    }
}

impl WaveletTransform for HaarTransform {
    fn forward(&self, plane: &mut [f32]) {
        let mut scratch = Vec::with_capacity(plane.len());
        for band in self.bands(plane.len()) {
            forward_step(&mut plane[..band], &mut scratch);
        }
    }

    fn inverse(&self, plane: &mut [f32]) {
        let mut scratch = Vec::with_capacity(plane.len());
        for band in self.bands(plane.len()).into_iter().rev() {
            inverse_step(&mut plane[..band], &mut scratch);
        }
    }
}

fn forward_step(band: &mut [f32], scratch: &mut Vec<f32>) {
    let pairs = band.len() / 2;
    scratch.clear();
    scratch.extend(band.chunks_exact(2).map(|p| (p[0] + p[1]) / 2.0));
    scratch.extend(band.chunks_exact(2).map(|p| (p[0] - p[1]) / 2.0));
    band[..2 * pairs].copy_from_slice(scratch);
}

fn inverse_step(band: &mut [f32], scratch: &mut Vec<f32>) {
    let pairs = band.len() / 2;
    let (averages, rest) = band.split_at(pairs);
    let details = &rest[..pairs];
    scratch.clear();
    for (&a, &d) in averages.iter().zip(details) {
        scratch.push(a + d);
        scratch.push(a - d);
    }
    band[..2 * pairs].copy_from_slice(scratch);
}
