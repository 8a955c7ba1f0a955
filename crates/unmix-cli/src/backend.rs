//! Mask model backends
//!
//! The separation engine only sees [`MaskModel`]. This module turns a model
//! file on disk into one, using ONNX Runtime when the crate is built with the
//! `onnx` feature.
//!
//! ONNX model contract:
//! - input: `[batch, 2, bins, crop_size]` f32 mixture magnitude, named by
//!   `model.input_name`
//! - first output: `[batch, 2, bins, crop_size]` (or `roi_size`) f32 mask

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use unmix_core::{MaskModel, Result, SeparationError};

use crate::settings::ModelConfig;

/// Available inference backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// ONNX Runtime via the ort crate
    #[default]
    OnnxRuntime,
}

impl BackendType {
    /// Display name for logs
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::OnnxRuntime => "ONNX Runtime",
        }
    }

    /// Check if this backend was compiled in
    pub fn is_available(&self) -> bool {
        match self {
            Self::OnnxRuntime => cfg!(feature = "onnx"),
        }
    }

    /// Get reason why backend is unavailable (if is_available() returns false)
    pub fn unavailable_reason(&self) -> Option<&'static str> {
        match self {
            Self::OnnxRuntime if !self.is_available() => {
                Some("built without the `onnx` feature")
            }
            _ => None,
        }
    }
}

/// Load the model at `path` with the configured backend
pub fn load_model(path: &Path, config: &ModelConfig) -> Result<Arc<dyn MaskModel>> {
    if !path.exists() {
        return Err(SeparationError::ModelNotFound(path.display().to_string()));
    }

    if let Some(reason) = config.backend.unavailable_reason() {
        return Err(SeparationError::BackendInitFailed(format!(
            "{}: {}",
            config.backend.display_name(),
            reason
        )));
    }

    match config.backend {
        BackendType::OnnxRuntime => load_onnx(path, config),
    }
}

#[cfg(feature = "onnx")]
fn load_onnx(path: &Path, config: &ModelConfig) -> Result<Arc<dyn MaskModel>> {
    Ok(Arc::new(onnx::OrtMaskModel::load(path, config)?))
}

#[cfg(not(feature = "onnx"))]
fn load_onnx(_path: &Path, _config: &ModelConfig) -> Result<Arc<dyn MaskModel>> {
    Err(SeparationError::BackendInitFailed(
        "ONNX Runtime support not compiled in".to_string(),
    ))
}

#[cfg(feature = "onnx")]
pub mod onnx {
    //! ONNX Runtime mask model
    //!
    //! `Session::run()` needs `&mut self`, so the session sits behind a
    //! `Mutex` and concurrent batches take turns on it.

    use std::path::Path;
    use std::sync::Mutex;

    use ort::session::Session;
    use ort::value::Tensor;
    use unmix_core::ndarray::{Array4, ArrayView4};
    use unmix_core::{Complex32, MaskModel, Result, SeparationError};

    use crate::settings::ModelConfig;

    pub struct OrtMaskModel {
        session: Mutex<Session>,
        name: String,
        input_name: String,
        offset: usize,
    }

    impl OrtMaskModel {
        pub fn load(path: &Path, config: &ModelConfig) -> Result<Self> {
            let session = Session::builder()
                .and_then(|b| b.with_intra_threads(config.intra_threads.max(1)))
                .and_then(|b| b.commit_from_file(path))
                .map_err(|e| {
                    SeparationError::BackendInitFailed(format!("Failed to load {:?}: {}", path, e))
                })?;

            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("onnx")
                .to_string();

            log::info!(
                "Loaded ONNX model '{}' from {:?} (input '{}', offset {})",
                name,
                path,
                config.input_name,
                config.offset
            );

            Ok(Self {
                session: Mutex::new(session),
                name,
                input_name: config.input_name.clone(),
                offset: config.offset,
            })
        }
    }

    impl MaskModel for OrtMaskModel {
        fn name(&self) -> &str {
            &self.name
        }

        fn offset(&self) -> usize {
            self.offset
        }

        fn predict_mask(&self, batch: ArrayView4<'_, Complex32>) -> Result<Array4<Complex32>> {
            let failed = |reason: String| SeparationError::InferenceFailed { batch: 0, reason };

            let magnitude = batch.mapv(|c| c.norm());
            let input_tensor = Tensor::from_array(magnitude)
                .map_err(|e| failed(format!("tensor creation error: {}", e)))?;

            let mut session = self
                .session
                .lock()
                .map_err(|_| failed("session lock poisoned".to_string()))?;

            let outputs = session
                .run(ort::inputs![self.input_name.as_str() => input_tensor])
                .map_err(|e| failed(format!("inference error: {}", e)))?;

            let (_, mask_value) = outputs
                .iter()
                .next()
                .ok_or_else(|| failed("model produced no output".to_string()))?;

            let (shape, data) = mask_value
                .try_extract_tensor::<f32>()
                .map_err(|e| failed(format!("mask extraction error: {}", e)))?;

            let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
            if dims.len() != 4 {
                return Err(SeparationError::ModelOutputShape {
                    expected: batch.shape().to_vec(),
                    actual: dims,
                });
            }

            let mask = Array4::from_shape_vec((dims[0], dims[1], dims[2], dims[3]), data.to_vec())
                .map_err(|e| failed(format!("mask shape error: {}", e)))?;

            Ok(mask.mapv(|m| Complex32::new(m, 0.0)))
        }
    }
}
