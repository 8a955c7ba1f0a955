//! unmix core - patch-based spectral source separation
//!
//! Splits stereo audio into two complementary tracks (instrumental and
//! vocals for the bundled models) with a neural mask predictor:
//!
//! 1. **STFT**: waveform to complex spectrogram ([`stft`])
//! 2. **Separation**: tile the spectrogram into context-padded patches, run
//!    the model per batch, stitch and optionally average a half-stride
//!    shifted pass, filter artifacts, split ([`separation`])
//! 3. **ISTFT**: both spectrograms back to waveforms ([`stft`])

pub mod config;
pub mod separation;
pub mod spectrogram;
pub mod stft;

pub use separation::{
    MaskModel, Result, SeparationError, Separator, SeparatorConfig, SplitSpectrograms,
};
pub use spectrogram::{Mask, Spectrogram};
pub use stft::StftConfig;

pub use ndarray;
pub use realfft::num_complex::Complex32;
