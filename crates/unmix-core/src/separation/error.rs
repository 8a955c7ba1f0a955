//! Separation error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during spectral separation
#[derive(Error, Debug)]
pub enum SeparationError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Spectrogram is empty ({channels} channels, {bins} bins, {frames} frames)")]
    EmptySpectrogram {
        channels: usize,
        bins: usize,
        frames: usize,
    },

    #[error("Channel mismatch: model expects {expected} channels, spectrogram has {actual}")]
    ChannelMismatch { expected: usize, actual: usize },

    #[error("Shape mismatch: spectrogram {spectrogram:?} vs mask {mask:?}")]
    ShapeMismatch {
        spectrogram: Vec<usize>,
        mask: Vec<usize>,
    },

    #[error("Model returned mask of shape {actual:?}, expected {expected:?}")]
    ModelOutputShape {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Inference failed on batch {batch}: {reason}")]
    InferenceFailed { batch: usize, reason: String },

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Failed to read audio file: {path}")]
    AudioReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to write stem file: {path}")]
    StemWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Backend initialization failed: {0}")]
    BackendInitFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SeparationError>;
