//! Mask post-processing
//!
//! Removes small, isolated islands of high mask magnitude. A confident region
//! that lasts only a few frames and covers only a few bins, surrounded by a
//! much lower mask, is far more often a spurious local detection than real
//! separated content.
//!
//! ## Algorithm
//!
//! For each channel, on the `(bin, frame)` plane of `|mask|`:
//!
//! 1. Mark cells with magnitude above `threshold`
//! 2. Group marked cells into 4-connected regions
//! 3. A region spanning `<= max_frames` frames and `<= max_bins` bins is an island
//! 4. Each island cell takes the mean magnitude of the island's boundary
//!    (unmarked cells 4-adjacent to the island)
//!
//! The phase of every cell is kept; only magnitudes change.

use ndarray::{Array2, ArrayView2, Axis, Zip};
use realfft::num_complex::Complex32;

use super::config::ArtifactConfig;
use crate::spectrogram::Mask;

/// Suppress isolated high-magnitude islands, keeping the mask's phase
pub fn postprocess_mask(mask: &Mask, config: &ArtifactConfig) -> Mask {
    let magnitude = mask.mapv(|c| c.norm());
    let mut cleaned = magnitude.clone();
    let mut islands = 0usize;

    for (channel, mut plane) in cleaned.axis_iter_mut(Axis(0)).enumerate() {
        let source = magnitude.index_axis(Axis(0), channel);
        for island in find_islands(source, config) {
            let Some(level) = boundary_mean(source, &island) else {
                continue;
            };
            for &(bin, frame) in &island.cells {
                plane[[bin, frame]] = level;
            }
            islands += 1;
        }
    }

    log::debug!(
        "postprocess_mask: suppressed {} islands (threshold={}, max_frames={}, max_bins={})",
        islands,
        config.threshold,
        config.max_frames,
        config.max_bins
    );

    let mut out = mask.clone();
    Zip::from(&mut out)
        .and(&cleaned)
        .and(&magnitude)
        .for_each(|value, &mag, &original| {
            if mag != original {
                *value = Complex32::from_polar(mag, value.arg());
            }
        });
    out
}

/// A 4-connected region of above-threshold cells
#[derive(Debug, Clone)]
struct Region {
    cells: Vec<(usize, usize)>,
    min_bin: usize,
    max_bin: usize,
    min_frame: usize,
    max_frame: usize,
}

impl Region {
    fn bins(&self) -> usize {
        self.max_bin - self.min_bin + 1
    }

    fn frames(&self) -> usize {
        self.max_frame - self.min_frame + 1
    }
}

/// Connected regions of one channel small enough to count as islands
fn find_islands(plane: ArrayView2<'_, f32>, config: &ArtifactConfig) -> Vec<Region> {
    let (bins, frames) = plane.dim();
    let mut visited = Array2::<bool>::from_elem((bins, frames), false);
    let mut islands = Vec::new();
    let mut stack = Vec::new();

    for bin in 0..bins {
        for frame in 0..frames {
            if visited[[bin, frame]] || plane[[bin, frame]] <= config.threshold {
                continue;
            }

            let mut region = Region {
                cells: Vec::new(),
                min_bin: bin,
                max_bin: bin,
                min_frame: frame,
                max_frame: frame,
            };
            visited[[bin, frame]] = true;
            stack.push((bin, frame));

            while let Some((b, f)) = stack.pop() {
                region.cells.push((b, f));
                region.min_bin = region.min_bin.min(b);
                region.max_bin = region.max_bin.max(b);
                region.min_frame = region.min_frame.min(f);
                region.max_frame = region.max_frame.max(f);

                for (nb, nf) in neighbours(b, f, bins, frames) {
                    if !visited[[nb, nf]] && plane[[nb, nf]] > config.threshold {
                        visited[[nb, nf]] = true;
                        stack.push((nb, nf));
                    }
                }
            }

            if region.frames() <= config.max_frames && region.bins() <= config.max_bins {
                islands.push(region);
            }
        }
    }

    islands
}

/// Mean magnitude of the cells bordering a region, `None` if nothing borders it
fn boundary_mean(plane: ArrayView2<'_, f32>, region: &Region) -> Option<f32> {
    let (bins, frames) = plane.dim();
    let mut seen = std::collections::HashSet::new();
    let mut sum = 0.0f32;

    for &(b, f) in &region.cells {
        for (nb, nf) in neighbours(b, f, bins, frames) {
            let outside = !region.cells.contains(&(nb, nf));
            if outside && seen.insert((nb, nf)) {
                sum += plane[[nb, nf]];
            }
        }
    }

    if seen.is_empty() {
        None
    } else {
        Some(sum / seen.len() as f32)
    }
}

/// In-bounds 4-neighbourhood of `(bin, frame)`
fn neighbours(
    bin: usize,
    frame: usize,
    bins: usize,
    frames: usize,
) -> impl Iterator<Item = (usize, usize)> {
    let up = (bin + 1 < bins).then(|| (bin + 1, frame));
    let down = bin.checked_sub(1).map(|b| (b, frame));
    let right = (frame + 1 < frames).then(|| (bin, frame + 1));
    let left = frame.checked_sub(1).map(|f| (bin, f));
    [up, down, right, left].into_iter().flatten()
}
