//! Padding planner
//!
//! Decides how many zero frames go on each side of a spectrogram so that the
//! padded result tiles exactly into `crop_size`-wide patches advancing by
//! `roi_size` frames, each patch keeping `offset` frames of context per side.

use super::error::{Result, SeparationError};

/// Left/right padding and patch stride for one separation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaddingPlan {
    /// Zero frames prepended to the spectrogram
    pub pad_left: usize,
    /// Zero frames appended to the spectrogram
    pub pad_right: usize,
    /// Patch stride, equal to the usable prediction width of one patch
    pub roi_size: usize,
    /// Context margin reserved on each side of a patch
    pub offset: usize,
}

impl PaddingPlan {
    /// Plan padding for `n_frames` frames of input
    ///
    /// The left pad is exactly the context margin, so the first prediction
    /// region starts at input frame 0. The right pad rounds the input up to
    /// the next whole stride and adds the trailing margin. An input that is
    /// already a whole number of strides still gets one extra stride, which
    /// matches the tiling the bundled models were evaluated with.
    pub fn new(n_frames: usize, crop_size: usize, offset: usize) -> Result<Self> {
        let roi_size = roi_size(crop_size, offset)?;
        let pad_left = offset;
        let pad_right = roi_size - (n_frames % roi_size) + offset;

        Ok(Self {
            pad_left,
            pad_right,
            roi_size,
            offset,
        })
    }

    /// The same plan moved by `shift` frames
    ///
    /// `shift` extra frames go on the left and `roi_size - shift` on the
    /// right, so the shifted plan still tiles exactly even for an odd stride.
    pub fn shifted(&self, shift: usize) -> Self {
        let shift = shift.min(self.roi_size);
        Self {
            pad_left: self.pad_left + shift,
            pad_right: self.pad_right + (self.roi_size - shift),
            ..*self
        }
    }

    /// Total frame count after padding `n_frames`
    pub fn padded_len(&self, n_frames: usize) -> usize {
        self.pad_left + n_frames + self.pad_right
    }

    /// Number of patches the padded spectrogram splits into
    pub fn num_patches(&self, n_frames: usize) -> usize {
        (self.padded_len(n_frames) - 2 * self.offset) / self.roi_size
    }

    /// Width of each patch including both context margins
    pub fn crop_size(&self) -> usize {
        self.roi_size + 2 * self.offset
    }
}

/// Usable prediction width of a `crop_size` patch with `offset` margins
pub fn roi_size(crop_size: usize, offset: usize) -> Result<usize> {
    match crop_size.checked_sub(2 * offset) {
        Some(roi) if roi > 0 => Ok(roi),
        _ => Err(SeparationError::InvalidConfig(format!(
            "crop_size ({}) must exceed twice the model offset ({})",
            crop_size, offset
        ))),
    }
}
