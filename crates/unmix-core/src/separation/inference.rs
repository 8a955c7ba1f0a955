//! Batched mask inference
//!
//! Groups patches into batches, runs the model once per batch and stitches
//! the central prediction region of every patch back into one continuous mask.
//! Batches are independent and run on the rayon pool; the stitched mask is
//! always assembled in patch index order.

use std::ops::Range;

use ndarray::{concatenate, s, stack, Array3, ArrayView3, Axis};
use rayon::prelude::*;
use realfft::num_complex::Complex32;

use super::error::{Result, SeparationError};
use super::model::MaskModel;
use super::patches::Patches;
use crate::spectrogram::Mask;

/// Run the model over every patch and return the stitched mask
///
/// The result spans `patches.len() * roi_size` frames, aligned so that mask
/// frame 0 corresponds to padded frame `offset`.
pub fn infer_mask(model: &dyn MaskModel, patches: &Patches<'_>, batch_size: usize) -> Result<Mask> {
    let batches = patches.batches(batch_size);
    log::debug!(
        "infer_mask: {} patches in {} batches (batch_size={}, crop={}, roi={})",
        patches.count_total(),
        batches.len(),
        batch_size,
        patches.crop_size(),
        patches.roi_size()
    );

    // Each batch yields its patches' prediction regions in order; collect()
    // keeps batch order even though batches finish out of order.
    let per_batch: Vec<Vec<Array3<Complex32>>> = batches
        .par_iter()
        .enumerate()
        .map(|(batch_index, range)| run_batch(model, patches, batch_index, range.clone()))
        .collect::<Result<_>>()?;

    let regions: Vec<ArrayView3<'_, Complex32>> =
        per_batch.iter().flatten().map(|region| region.view()).collect();

    if regions.is_empty() {
        return Err(SeparationError::InvalidConfig(
            "padded spectrogram produced no patches".to_string(),
        ));
    }

    concatenate(Axis(2), &regions).map_err(|e| {
        SeparationError::InvalidConfig(format!("failed to stitch mask regions: {}", e))
    })
}

/// Stack one batch, run the model and cut out each patch's prediction region
fn run_batch(
    model: &dyn MaskModel,
    patches: &Patches<'_>,
    batch_index: usize,
    range: Range<usize>,
) -> Result<Vec<Array3<Complex32>>> {
    let views: Vec<ArrayView3<'_, Complex32>> = range
        .clone()
        .filter_map(|i| patches.get(i))
        .map(|patch| patch.view)
        .collect();

    let input = stack(Axis(0), &views).map_err(|e| SeparationError::InferenceFailed {
        batch: batch_index,
        reason: format!("failed to stack crops: {}", e),
    })?;

    let (batch, channels, bins, crop) = input.dim();
    let output = model
        .predict_mask(input.view())
        .map_err(|e| match e {
            SeparationError::InferenceFailed { .. } => e,
            other => SeparationError::InferenceFailed {
                batch: batch_index,
                reason: other.to_string(),
            },
        })?;

    let (out_batch, out_channels, out_bins, width) = output.dim();
    let roi = patches.roi_size();
    let offset = patches.offset();

    let lead = if width == crop {
        offset
    } else if width == roi {
        0
    } else {
        usize::MAX
    };

    if out_batch != batch || out_channels != channels || out_bins != bins || lead == usize::MAX {
        return Err(SeparationError::ModelOutputShape {
            expected: vec![batch, channels, bins, crop],
            actual: vec![out_batch, out_channels, out_bins, width],
        });
    }

    log::debug!(
        "run_batch: batch {} ({} crops, patches {:?})",
        batch_index,
        batch,
        range
    );

    Ok(output
        .outer_iter()
        .map(|mask| mask.slice(s![.., .., lead..lead + roi]).to_owned())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::separation::padding::PaddingPlan;
    use crate::spectrogram::{pad_frames, Spectrogram};
    use ndarray::{Array4, ArrayView4};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Echoes the input back as the mask, full crop width
    struct EchoModel {
        offset: usize,
        calls: AtomicUsize,
    }

    impl MaskModel for EchoModel {
        fn name(&self) -> &str {
            "echo"
        }

        fn offset(&self) -> usize {
            self.offset
        }

        fn predict_mask(&self, batch: ArrayView4<'_, Complex32>) -> Result<Array4<Complex32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(batch.to_owned())
        }
    }

    /// Returns only the central region, like models that trim internally
    struct TrimmingEchoModel {
        offset: usize,
    }

    impl MaskModel for TrimmingEchoModel {
        fn name(&self) -> &str {
            "trimming-echo"
        }

        fn offset(&self) -> usize {
            self.offset
        }

        fn predict_mask(&self, batch: ArrayView4<'_, Complex32>) -> Result<Array4<Complex32>> {
            let width = batch.len_of(Axis(3)) - 2 * self.offset;
            Ok(batch
                .slice(s![.., .., .., self.offset..self.offset + width])
                .to_owned())
        }
    }

    struct BadShapeModel;

    impl MaskModel for BadShapeModel {
        fn name(&self) -> &str {
            "bad-shape"
        }

        fn offset(&self) -> usize {
            2
        }

        fn predict_mask(&self, batch: ArrayView4<'_, Complex32>) -> Result<Array4<Complex32>> {
            let (b, c, f, _) = batch.dim();
            Ok(Array4::zeros((b, c, f, 3)))
        }
    }

    /// Fails on any batch of exactly `fail_at_batch_len` crops
    struct FailingModel {
        fail_at_batch_len: usize,
    }

    impl MaskModel for FailingModel {
        fn name(&self) -> &str {
            "failing"
        }

        fn offset(&self) -> usize {
            1
        }

        fn predict_mask(&self, batch: ArrayView4<'_, Complex32>) -> Result<Array4<Complex32>> {
            if batch.len_of(Axis(0)) == self.fail_at_batch_len {
                return Err(SeparationError::InferenceFailed {
                    batch: 0,
                    reason: "device lost".to_string(),
                });
            }
            Ok(batch.to_owned())
        }
    }

    fn frame_index_spec(frames: usize) -> Spectrogram {
        Spectrogram::from_shape_fn((2, 4, frames), |(c, b, t)| {
            Complex32::new(t as f32 + 1.0, (c * 10 + b) as f32)
        })
    }

    #[test]
    fn test_stitched_mask_covers_every_frame_once() {
        let n = 103;
        let (crop, offset) = (20, 3);
        let spec = frame_index_spec(n);
        let plan = PaddingPlan::new(n, crop, offset).unwrap();
        let padded = pad_frames(spec.view(), plan.pad_left, plan.pad_right);
        let patches = Patches::new(padded.view(), plan.roi_size, crop, offset);

        let model = EchoModel {
            offset,
            calls: AtomicUsize::new(0),
        };
        let mask = infer_mask(&model, &patches, 4).unwrap();

        let padded_len = plan.padded_len(n);
        assert_eq!(mask.len_of(Axis(2)), padded_len - 2 * offset);
        // echoed mask frame k must equal padded frame k + offset: no gaps, no overlaps
        assert_eq!(mask, padded.slice(s![.., .., offset..padded_len - offset]));
        assert_eq!(
            model.calls.load(Ordering::SeqCst),
            (patches.len() + 3) / 4
        );
    }

    #[test]
    fn test_trimmed_model_output_matches_full_width() {
        let n = 64;
        let (crop, offset) = (16, 4);
        let spec = frame_index_spec(n);
        let plan = PaddingPlan::new(n, crop, offset).unwrap();
        let padded = pad_frames(spec.view(), plan.pad_left, plan.pad_right);
        let patches = Patches::new(padded.view(), plan.roi_size, crop, offset);

        let full = infer_mask(
            &EchoModel {
                offset,
                calls: AtomicUsize::new(0),
            },
            &patches,
            2,
        )
        .unwrap();
        let trimmed = infer_mask(&TrimmingEchoModel { offset }, &patches, 5).unwrap();
        assert_eq!(full, trimmed);
    }

    #[test]
    fn test_wrong_output_width_is_rejected() {
        let spec = frame_index_spec(30);
        let plan = PaddingPlan::new(30, 10, 2).unwrap();
        let padded = pad_frames(spec.view(), plan.pad_left, plan.pad_right);
        let patches = Patches::new(padded.view(), plan.roi_size, 10, 2);

        let err = infer_mask(&BadShapeModel, &patches, 4).unwrap_err();
        assert!(matches!(err, SeparationError::ModelOutputShape { .. }));
    }

    #[test]
    fn test_failing_batch_aborts_whole_call() {
        // 3 patches with batch_size 2 -> batches of 2 and 1; the short one fails
        let n = 10;
        let plan = PaddingPlan::new(n, 6, 1).unwrap();
        let spec = frame_index_spec(n);
        let padded = pad_frames(spec.view(), plan.pad_left, plan.pad_right);
        let patches = Patches::new(padded.view(), plan.roi_size, 6, 1);
        assert_eq!(patches.len(), 3);

        let err = infer_mask(&FailingModel { fail_at_batch_len: 1 }, &patches, 2).unwrap_err();
        assert!(matches!(err, SeparationError::InferenceFailed { .. }));
    }
}
