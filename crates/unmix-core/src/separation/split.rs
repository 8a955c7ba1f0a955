//! Spectral splitting
//!
//! Applies a mask to a spectrogram and returns both halves:
//!
//! ```text
//! target   = spectrogram * mask
//! residual = spectrogram - target
//! ```
//!
//! so `target + residual` reproduces the input up to floating point rounding.

use ndarray::ArrayView3;
use realfft::num_complex::Complex32;

use super::error::{Result, SeparationError};
use crate::spectrogram::Spectrogram;

/// The two complementary spectrograms produced by a separation
#[derive(Debug, Clone)]
pub struct SplitSpectrograms {
    /// Content selected by the mask (instrumental for the bundled models)
    pub target: Spectrogram,
    /// Everything the mask rejected (vocals for the bundled models)
    pub residual: Spectrogram,
}

/// Split `spectrogram` into masked target and residual
pub fn split(
    spectrogram: ArrayView3<'_, Complex32>,
    mask: ArrayView3<'_, Complex32>,
) -> Result<SplitSpectrograms> {
    if spectrogram.shape() != mask.shape() {
        return Err(SeparationError::ShapeMismatch {
            spectrogram: spectrogram.shape().to_vec(),
            mask: mask.shape().to_vec(),
        });
    }

    let target = &spectrogram * &mask;
    let residual = &spectrogram - &target;

    Ok(SplitSpectrograms { target, residual })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_spec() -> Spectrogram {
        Spectrogram::from_shape_fn((2, 5, 7), |(c, b, t)| {
            Complex32::new((c + b * t) as f32 * 0.37 - 1.0, (b as f32 - t as f32) * 0.11)
        })
    }

    #[test]
    fn test_target_plus_residual_is_input() {
        let spec = test_spec();
        let mask = Spectrogram::from_shape_fn((2, 5, 7), |(c, b, t)| {
            Complex32::new(((c + b + t) % 11) as f32 / 10.0, 0.0)
        });

        let out = split(spec.view(), mask.view()).unwrap();
        for ((s, t), r) in spec.iter().zip(out.target.iter()).zip(out.residual.iter()) {
            let sum = t + r;
            assert!((sum - s).norm() <= 1e-6 * s.norm().max(1.0));
        }
    }

    #[test]
    fn test_unit_and_zero_masks() {
        let spec = test_spec();
        let ones = Spectrogram::from_elem(spec.dim(), Complex32::new(1.0, 0.0));
        let zeros = Spectrogram::zeros(spec.dim());

        let all = split(spec.view(), ones.view()).unwrap();
        assert_eq!(all.target, spec);
        assert!(all.residual.iter().all(|c| c.norm() == 0.0));

        let none = split(spec.view(), zeros.view()).unwrap();
        assert!(none.target.iter().all(|c| c.norm() == 0.0));
        assert_eq!(none.residual, spec);
    }

    #[test]
    fn test_complex_mask_rotates_phase() {
        let spec = Spectrogram::from_elem((1, 1, 1), Complex32::new(1.0, 0.0));
        let mask = Spectrogram::from_elem((1, 1, 1), Complex32::new(0.0, 1.0));
        let out = split(spec.view(), mask.view()).unwrap();
        assert_eq!(out.target[[0, 0, 0]], Complex32::new(0.0, 1.0));
        assert_eq!(out.residual[[0, 0, 0]], Complex32::new(1.0, -1.0));
    }

    #[test]
    fn test_shape_mismatch() {
        let spec = test_spec();
        let mask = Spectrogram::zeros((2, 5, 6));
        assert!(matches!(
            split(spec.view(), mask.view()),
            Err(SeparationError::ShapeMismatch { .. })
        ));
    }
}
