//! Separator - runs the full patch-based separation for one spectrogram
//!
//! Holds only immutable configuration and a shared model handle, so one
//! `Separator` can serve concurrent callers.

use std::sync::Arc;

use ndarray::{ArrayView3, Axis};
use realfft::num_complex::Complex32;

use super::config::SeparatorConfig;
use super::error::{Result, SeparationError};
use super::inference::infer_mask;
use super::model::MaskModel;
use super::padding::PaddingPlan;
use super::patches::Patches;
use super::postprocess::postprocess_mask;
use super::split::{split, SplitSpectrograms};
use crate::spectrogram::{normalize, pad_frames, trim_frames, Mask};

/// Patch-based spectral separation engine
///
/// Example usage:
/// ```ignore
/// let separator = Separator::new(model, SeparatorConfig::default())?;
/// let SplitSpectrograms { target, residual } = separator.separate(spec.view())?;
/// ```
pub struct Separator {
    model: Arc<dyn MaskModel>,
    config: SeparatorConfig,
}

impl Separator {
    /// Create a separator, checking the config against the model's offset
    pub fn new(model: Arc<dyn MaskModel>, config: SeparatorConfig) -> Result<Self> {
        config.validate(model.offset())?;
        log::info!(
            "Separator using model '{}' (offset={}, crop_size={}, batch_size={}, postprocess={}, tta={})",
            model.name(),
            model.offset(),
            config.crop_size,
            config.batch_size,
            config.postprocess,
            config.tta
        );
        Ok(Self { model, config })
    }

    /// Get current configuration
    pub fn config(&self) -> &SeparatorConfig {
        &self.config
    }

    /// Context margin of the underlying model
    pub fn offset(&self) -> usize {
        self.model.offset()
    }

    /// Separate with the mode selected by `config.tta`
    pub fn run(&self, spec: ArrayView3<'_, Complex32>) -> Result<SplitSpectrograms> {
        if self.config.tta {
            self.separate_tta(spec)
        } else {
            self.separate(spec)
        }
    }

    /// Single-pass separation
    pub fn separate(&self, spec: ArrayView3<'_, Complex32>) -> Result<SplitSpectrograms> {
        let mask = self.predict_mask(spec)?;
        self.apply(spec, mask)
    }

    /// Separation averaged over two tilings offset by half a stride
    pub fn separate_tta(&self, spec: ArrayView3<'_, Complex32>) -> Result<SplitSpectrograms> {
        let mask = self.predict_mask_tta(spec)?;
        self.apply(spec, mask)
    }

    /// Mask for `spec` from a single tiling, `n_frames` long
    pub fn predict_mask(&self, spec: ArrayView3<'_, Complex32>) -> Result<Mask> {
        self.check_input(spec)?;
        let n_frames = spec.len_of(Axis(2));
        let plan = PaddingPlan::new(n_frames, self.config.crop_size, self.offset())?;

        let normalized = normalize(spec);
        let mask = self.run_pass(normalized.view(), &plan)?;
        Ok(trim_frames(mask.view(), 0, n_frames))
    }

    /// Mask for `spec` averaged over the regular tiling and one shifted by
    /// half a stride, `n_frames` long
    ///
    /// Tiling seams land on different frames in the two passes, so averaging
    /// softens them. Both passes run concurrently.
    pub fn predict_mask_tta(&self, spec: ArrayView3<'_, Complex32>) -> Result<Mask> {
        self.check_input(spec)?;
        let n_frames = spec.len_of(Axis(2));
        let plan = PaddingPlan::new(n_frames, self.config.crop_size, self.offset())?;
        let shift = plan.roi_size / 2;
        let shifted = plan.shifted(shift);

        let normalized = normalize(spec);
        let (regular, phased) = rayon::join(
            || self.run_pass(normalized.view(), &plan),
            || self.run_pass(normalized.view(), &shifted),
        );

        let regular = trim_frames(regular?.view(), 0, n_frames);
        let phased = trim_frames(phased?.view(), shift, n_frames);
        log::debug!(
            "predict_mask_tta: averaged passes at shift 0 and {} ({} frames)",
            shift,
            n_frames
        );

        Ok((&regular + &phased).mapv(|c| c * 0.5))
    }

    /// Pad, tile and infer one pass; mask frame `k` lines up with padded frame `k + offset`
    fn run_pass(&self, normalized: ArrayView3<'_, Complex32>, plan: &PaddingPlan) -> Result<Mask> {
        let n_frames = normalized.len_of(Axis(2));
        let padded = pad_frames(normalized, plan.pad_left, plan.pad_right);
        let patches = Patches::new(padded.view(), plan.roi_size, plan.crop_size(), plan.offset);

        log::debug!(
            "run_pass: {} frames padded {}+{} -> {} patches of {} (roi {})",
            n_frames,
            plan.pad_left,
            plan.pad_right,
            patches.len(),
            plan.crop_size(),
            plan.roi_size
        );

        infer_mask(self.model.as_ref(), &patches, self.config.batch_size)
    }

    /// Optional artifact filtering followed by the split
    fn apply(&self, spec: ArrayView3<'_, Complex32>, mask: Mask) -> Result<SplitSpectrograms> {
        let mask = if self.config.postprocess {
            postprocess_mask(&mask, &self.config.artifacts)
        } else {
            mask
        };
        split(spec, mask.view())
    }

    fn check_input(&self, spec: ArrayView3<'_, Complex32>) -> Result<()> {
        let (channels, bins, frames) = spec.dim();
        if channels == 0 || bins == 0 || frames == 0 {
            return Err(SeparationError::EmptySpectrogram {
                channels,
                bins,
                frames,
            });
        }
        let expected = self.model.channels();
        if channels != expected {
            return Err(SeparationError::ChannelMismatch {
                expected,
                actual: channels,
            });
        }
        Ok(())
    }
}
