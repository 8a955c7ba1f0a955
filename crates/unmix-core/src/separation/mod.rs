//! Patch-based spectral separation
//!
//! Splits a complex spectrogram of any length into a masked target and its
//! residual, using a neural mask predictor that only accepts fixed-width crops.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                       Separator                          │
//! │  • normalises input, runs one or two passes (TTA)        │
//! │  • averages passes, optional artifact filter, split      │
//! └─────────────────────────────────────────────────────────┘
//!                              │  per pass
//!                              ▼
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐
//! │ PaddingPlan  │──▶│   Patches    │──▶│   infer_mask     │
//! │ pad + stride │   │ crop views   │   │ rayon batches    │
//! └──────────────┘   └──────────────┘   └──────────────────┘
//!                                                │
//!                                                ▼
//!                                   ┌──────────────────────┐
//!                                   │ MaskModel (trait)    │
//!                                   │ • predict_mask()     │
//!                                   └──────────────────────┘
//! ```

mod config;
mod error;
mod inference;
mod model;
mod padding;
mod patches;
mod postprocess;
mod separator;
mod split;

pub use config::{ArtifactConfig, SeparatorConfig};
pub use error::{Result, SeparationError};
pub use inference::infer_mask;
pub use model::MaskModel;
pub use padding::{roi_size, PaddingPlan};
pub use patches::{Patch, Patches};
pub use postprocess::postprocess_mask;
pub use separator::Separator;
pub use split::{split, SplitSpectrograms};
