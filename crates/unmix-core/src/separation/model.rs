//! Mask prediction capability
//!
//! The separation engine never sees a network directly. Anything that turns a
//! batch of spectrogram crops into a batch of masks can drive it: an ONNX
//! session, a remote service, or a deterministic stub in tests.

use ndarray::{Array4, ArrayView4};
use realfft::num_complex::Complex32;

use super::error::Result;

/// Trait for neural mask predictors
///
/// ## Implementing a New Model
///
/// ```ignore
/// struct MyModel;
///
/// impl MaskModel for MyModel {
///     fn name(&self) -> &str { "my-model" }
///     fn offset(&self) -> usize { 64 }
///     fn predict_mask(&self, batch: ArrayView4<'_, Complex32>) -> Result<Array4<Complex32>> {
///         // batch: (batch, channel, bin, crop_size)
///         // return one mask per crop, crop_size or roi_size frames wide
///     }
/// }
/// ```
pub trait MaskModel: Send + Sync {
    /// Model name for logging
    fn name(&self) -> &str;

    /// Context frames on each side of a crop that the model reads but does
    /// not predict for
    fn offset(&self) -> usize;

    /// Number of audio channels the model was trained on
    fn channels(&self) -> usize {
        2
    }

    /// Predict masks for a batch of crops
    ///
    /// # Arguments
    /// * `batch` - Crops shaped `(batch, channel, bin, crop_size)`, amplitude
    ///   normalised to at most 1.0
    ///
    /// # Returns
    /// Masks shaped `(batch, channel, bin, width)`, where `width` is either the
    /// full `crop_size` or only the central `crop_size - 2 * offset` frames.
    /// Must be deterministic for identical input.
    fn predict_mask(&self, batch: ArrayView4<'_, Complex32>) -> Result<Array4<Complex32>>;
}
