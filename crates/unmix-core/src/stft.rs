//! Short-time Fourier transform between stereo waveforms and spectrograms
//!
//! Frames are centred: the signal is zero-padded by `n_fft / 2` on both sides,
//! so frame `t` is centred on sample `t * hop_length`. A periodic Hann window
//! is used in both directions and the inverse normalises by the summed squared
//! window, which makes analysis followed by synthesis an identity away from
//! the very edges.

use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};
use realfft::num_complex::Complex32;
use realfft::RealFftPlanner;
use serde::{Deserialize, Serialize};

use crate::separation::{Result, SeparationError};
use crate::spectrogram::Spectrogram;

/// STFT parameters the separation model was calibrated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StftConfig {
    /// FFT size; `n_fft / 2 + 1` frequency bins
    pub n_fft: usize,
    /// Samples between successive frames
    pub hop_length: usize,
}

impl Default for StftConfig {
    fn default() -> Self {
        Self {
            n_fft: 2048,
            hop_length: 512,
        }
    }
}

impl StftConfig {
    pub fn validate(&self) -> Result<()> {
        if self.n_fft < 2 || self.n_fft % 2 != 0 {
            return Err(SeparationError::InvalidConfig(format!(
                "n_fft must be an even number >= 2, got {}",
                self.n_fft
            )));
        }
        if self.hop_length == 0 || self.hop_length > self.n_fft {
            return Err(SeparationError::InvalidConfig(format!(
                "hop_length must be in 1..={}, got {}",
                self.n_fft, self.hop_length
            )));
        }
        Ok(())
    }

    /// Frequency bins per frame
    pub fn num_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Frames produced for `num_samples` input samples
    pub fn num_frames(&self, num_samples: usize) -> usize {
        1 + num_samples / self.hop_length
    }
}

/// Periodic Hann window
fn hann(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * i as f32 / n as f32;
            0.5 * (1.0 - phase.cos())
        })
        .collect()
}

/// Transform `(channel, sample)` audio into a `(channel, bin, frame)` spectrogram
pub fn wave_to_spectrogram(wave: ArrayView2<'_, f32>, config: &StftConfig) -> Result<Spectrogram> {
    config.validate()?;
    let (channels, num_samples) = wave.dim();
    let n_fft = config.n_fft;
    let hop = config.hop_length;
    let half = n_fft / 2;
    let num_frames = config.num_frames(num_samples);

    let mut planner = RealFftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(n_fft);
    let window = hann(n_fft);

    let mut spec = Array3::<Complex32>::zeros((channels, config.num_bins(), num_frames));
    let mut scratch = fft.make_scratch_vec();
    let mut frame_buf = fft.make_input_vec();
    let mut spectrum = fft.make_output_vec();

    for (ch, samples) in wave.axis_iter(Axis(0)).enumerate() {
        let mut padded = vec![0.0f32; num_samples + 2 * half];
        for (dst, &src) in padded[half..half + num_samples].iter_mut().zip(samples.iter()) {
            *dst = src;
        }

        for frame in 0..num_frames {
            let start = frame * hop;
            for (i, value) in frame_buf.iter_mut().enumerate() {
                *value = padded[start + i] * window[i];
            }

            fft.process_with_scratch(&mut frame_buf, &mut spectrum, &mut scratch)
                .map_err(|e| SeparationError::InvalidConfig(format!("FFT failed: {:?}", e)))?;

            for (bin, &value) in spectrum.iter().enumerate() {
                spec[[ch, bin, frame]] = value;
            }
        }
    }

    log::debug!(
        "wave_to_spectrogram: {} channels x {} samples -> {} bins x {} frames",
        channels,
        num_samples,
        config.num_bins(),
        num_frames
    );

    Ok(spec)
}

/// Inverse of [`wave_to_spectrogram`], trimmed or zero-extended to `length` samples
pub fn spectrogram_to_wave(
    spec: ArrayView3<'_, Complex32>,
    config: &StftConfig,
    length: usize,
) -> Result<Array2<f32>> {
    config.validate()?;
    let (channels, bins, num_frames) = spec.dim();
    if bins != config.num_bins() {
        return Err(SeparationError::ShapeMismatch {
            spectrogram: spec.shape().to_vec(),
            mask: vec![channels, config.num_bins(), num_frames],
        });
    }

    let n_fft = config.n_fft;
    let hop = config.hop_length;
    let half = n_fft / 2;

    let mut planner = RealFftPlanner::<f32>::new();
    let ifft = planner.plan_fft_inverse(n_fft);
    let window = hann(n_fft);

    let full_len = num_frames.saturating_sub(1) * hop + n_fft;
    let mut window_sum = vec![0.0f32; full_len];
    for frame in 0..num_frames {
        let start = frame * hop;
        for (i, w) in window.iter().enumerate() {
            window_sum[start + i] += w * w;
        }
    }

    let mut wave = Array2::<f32>::zeros((channels, length));
    let mut scratch = ifft.make_scratch_vec();
    let mut spectrum = ifft.make_input_vec();
    let mut time_frame = ifft.make_output_vec();

    for (ch, mut out) in wave.axis_iter_mut(Axis(0)).enumerate() {
        let mut output = vec![0.0f32; full_len];

        for frame in 0..num_frames {
            for (bin, value) in spectrum.iter_mut().enumerate() {
                *value = spec[[ch, bin, frame]];
            }
            // A real signal has purely real DC and Nyquist bins
            spectrum[0].im = 0.0;
            spectrum[bins - 1].im = 0.0;

            ifft.process_with_scratch(&mut spectrum, &mut time_frame, &mut scratch)
                .map_err(|e| SeparationError::InvalidConfig(format!("IFFT failed: {:?}", e)))?;

            let start = frame * hop;
            for (i, &sample) in time_frame.iter().enumerate() {
                output[start + i] += sample * window[i] / n_fft as f32;
            }
        }

        for (sample, &norm) in output.iter_mut().zip(window_sum.iter()) {
            if norm > 1e-8 {
                *sample /= norm;
            }
        }

        for (i, value) in out.iter_mut().enumerate() {
            *value = output.get(half + i).copied().unwrap_or(0.0);
        }
    }

    Ok(wave)
}
