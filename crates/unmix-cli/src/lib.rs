//! unmix command line front end
//!
//! Wraps the separation engine from `unmix-core` with everything needed to
//! go from a file or URL to two WAV files:
//!
//! - [`args`]: command line parsing
//! - [`settings`]: YAML application config
//! - [`fetch`]: URL inputs and model downloads
//! - [`audio`]: decoding, resampling and WAV output
//! - [`backend`]: model loading (ONNX Runtime)
//! - [`service`]: the end-to-end pipeline

pub mod args;
pub mod audio;
pub mod backend;
pub mod fetch;
pub mod service;
pub mod settings;
