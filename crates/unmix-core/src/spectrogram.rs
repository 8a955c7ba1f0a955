//! Spectrogram and mask containers
//!
//! Both are `(channel, frequency bin, time frame)` arrays of complex values.
//! Real-valued masks carry a zero imaginary part.

use ndarray::{s, Array3, ArrayView3};
use realfft::num_complex::Complex32;

/// Complex spectrogram, indexed `(channel, bin, frame)`
pub type Spectrogram = Array3<Complex32>;

/// Per-bin, per-frame complex weighting with the same layout as [`Spectrogram`]
pub type Mask = Array3<Complex32>;

/// Largest absolute magnitude over all channels, bins and frames
///
/// Returns 0.0 for an empty or all-silent spectrogram.
pub fn max_magnitude(spec: ArrayView3<'_, Complex32>) -> f32 {
    spec.iter().fold(0.0f32, |acc, c| acc.max(c.norm()))
}

/// Divide every element by the global max magnitude
///
/// A silent spectrogram is returned unchanged instead of being divided by zero.
pub fn normalize(spec: ArrayView3<'_, Complex32>) -> Spectrogram {
    let peak = max_magnitude(spec);
    if peak > 0.0 {
        spec.mapv(|c| c / peak)
    } else {
        spec.to_owned()
    }
}

/// Zero-pad along the time axis
pub fn pad_frames(spec: ArrayView3<'_, Complex32>, left: usize, right: usize) -> Spectrogram {
    let (channels, bins, frames) = spec.dim();
    let mut padded = Array3::<Complex32>::zeros((channels, bins, left + frames + right));
    padded.slice_mut(s![.., .., left..left + frames]).assign(&spec);
    padded
}

/// Keep frames `[start, start + len)`
pub fn trim_frames(mask: ArrayView3<'_, Complex32>, start: usize, len: usize) -> Mask {
    mask.slice(s![.., .., start..start + len]).to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_magnitude_uses_complex_norm() {
        let mut spec = Spectrogram::zeros((2, 3, 4));
        spec[[1, 2, 3]] = Complex32::new(3.0, -4.0);
        spec[[0, 0, 0]] = Complex32::new(1.0, 1.0);
        assert!((max_magnitude(spec.view()) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_silence_is_noop() {
        let spec = Spectrogram::zeros((2, 4, 8));
        let out = normalize(spec.view());
        assert_eq!(out, spec);
    }

    #[test]
    fn test_normalize_peak_is_one() {
        let mut spec = Spectrogram::zeros((2, 2, 2));
        spec[[0, 1, 1]] = Complex32::new(0.0, 8.0);
        spec[[1, 0, 0]] = Complex32::new(2.0, 0.0);
        let out = normalize(spec.view());
        assert!((max_magnitude(out.view()) - 1.0).abs() < 1e-6);
        assert!((out[[1, 0, 0]].re - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_pad_then_trim_restores_frames() {
        let spec = Spectrogram::from_shape_fn((2, 3, 5), |(c, b, t)| {
            Complex32::new((c * 100 + b * 10 + t) as f32, 1.0)
        });
        let padded = pad_frames(spec.view(), 4, 7);
        assert_eq!(padded.dim(), (2, 3, 16));
        assert_eq!(padded[[1, 2, 0]], Complex32::new(0.0, 0.0));
        assert_eq!(trim_frames(padded.view(), 4, 5), spec);
    }
}
