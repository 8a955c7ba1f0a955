//! Patch extraction
//!
//! Slices a padded spectrogram into fixed-width crops. Patch `i` covers padded
//! frames `[i * roi_size, i * roi_size + crop_size)`, so neighbours overlap by
//! `2 * offset` frames. Patches borrow the padded spectrogram; nothing is copied
//! until a batch is stacked for inference.

use std::ops::Range;

use ndarray::{s, ArrayView3, Axis};
use realfft::num_complex::Complex32;

/// One model input crop
#[derive(Debug, Clone)]
pub struct Patch<'a> {
    /// Position in the patch sequence
    pub index: usize,
    /// First padded frame covered by the crop
    pub start: usize,
    /// `(channel, bin, crop_size)` view into the padded spectrogram
    pub view: ArrayView3<'a, Complex32>,
}

/// Ordered, restartable sequence of patches over a padded spectrogram
#[derive(Debug, Clone)]
pub struct Patches<'a> {
    padded: ArrayView3<'a, Complex32>,
    roi_size: usize,
    crop_size: usize,
    offset: usize,
    count: usize,
    next: usize,
}

impl<'a> Patches<'a> {
    pub fn new(
        padded: ArrayView3<'a, Complex32>,
        roi_size: usize,
        crop_size: usize,
        offset: usize,
    ) -> Self {
        let usable = padded.len_of(Axis(2)).saturating_sub(2 * offset);
        debug_assert_eq!(
            usable % roi_size,
            0,
            "padded length does not tile into roi_size strides"
        );
        debug_assert_eq!(crop_size, roi_size + 2 * offset);

        Self {
            padded,
            roi_size,
            crop_size,
            offset,
            count: usable / roi_size,
            next: 0,
        }
    }

    /// Total number of patches, independent of iteration progress
    pub fn count_total(&self) -> usize {
        self.count
    }

    pub fn roi_size(&self) -> usize {
        self.roi_size
    }

    pub fn crop_size(&self) -> usize {
        self.crop_size
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Random access to patch `index`
    pub fn get(&self, index: usize) -> Option<Patch<'a>> {
        if index >= self.count {
            return None;
        }
        let start = index * self.roi_size;
        Some(Patch {
            index,
            start,
            view: self.padded.slice_move(s![.., .., start..start + self.crop_size]),
        })
    }

    /// Consecutive index ranges of at most `batch_size` patches
    pub fn batches(&self, batch_size: usize) -> Vec<Range<usize>> {
        let batch_size = batch_size.max(1);
        (0..self.count)
            .step_by(batch_size)
            .map(|start| start..(start + batch_size).min(self.count))
            .collect()
    }
}

impl<'a> Iterator for Patches<'a> {
    type Item = Patch<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let patch = self.get(self.next)?;
        self.next += 1;
        Some(patch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Patches<'_> {}
