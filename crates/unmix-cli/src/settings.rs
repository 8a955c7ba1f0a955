//! Application configuration for the unmix binary
//!
//! Stored as YAML. Default location: `~/.config/unmix/config.yaml`

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use unmix_core::{SeparatorConfig, StftConfig};

use crate::backend::BackendType;

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Separation engine settings
    pub separator: SeparatorConfig,
    /// STFT parameters matching the model
    pub stft: StftConfig,
    /// Sample rate the model expects; inputs are resampled to it
    pub sample_rate: u32,
    /// Mask model settings
    pub model: ModelConfig,
    /// Where `instruments.wav` and `vocals.wav` are written
    pub output_dir: PathBuf,
    /// Worker threads for batch inference (0 = one per core)
    pub threads: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            separator: SeparatorConfig::default(),
            stft: StftConfig::default(),
            sample_rate: 22050,
            model: ModelConfig::default(),
            output_dir: PathBuf::from("."),
            threads: 0,
        }
    }
}

impl AppConfig {
    /// Clamp values with hard ranges
    pub fn validate(&mut self) {
        self.sample_rate = self.sample_rate.clamp(8000, 192_000);
        self.separator.batch_size = self.separator.batch_size.clamp(1, 256);
        self.threads = self.threads.min(256);
    }
}

/// Mask model configuration section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Inference backend
    pub backend: BackendType,
    /// Model file; defaults to `{cache_dir}/unmix/models/baseline.onnx`
    pub path: Option<PathBuf>,
    /// Where to fetch the model from when `path` doesn't exist yet
    pub url: Option<String>,
    /// Name of the model's input tensor
    pub input_name: String,
    /// Context frames the model consumes on each side of a crop
    pub offset: usize,
    /// ONNX Runtime intra-op threads per session
    pub intra_threads: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: BackendType::default(),
            path: None,
            url: None,
            input_name: String::from("input"),
            offset: 64,
            intra_threads: 1,
        }
    }
}

impl ModelConfig {
    pub const DEFAULT_FILENAME: &'static str = "baseline.onnx";

    /// Configured model path, or the default location in the cache dir
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            unmix_core::config::default_cache_dir()
                .join("models")
                .join(Self::DEFAULT_FILENAME)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = AppConfig::default();
        assert_eq!(config.sample_rate, 22050);
        assert_eq!(config.stft.n_fft, 2048);
        assert_eq!(config.stft.hop_length, 512);
        assert_eq!(config.separator.crop_size, 256);
        assert_eq!(config.separator.batch_size, 4);
        assert_eq!(config.model.offset, 64);
    }

    #[test]
    fn test_validate_clamps() {
        let mut config = AppConfig {
            sample_rate: 10,
            ..Default::default()
        };
        config.separator.batch_size = 0;
        config.validate();
        assert_eq!(config.sample_rate, 8000);
        assert_eq!(config.separator.batch_size, 1);
    }

    #[test]
    fn test_yaml_sections() {
        let yaml = "
sample_rate: 44100
separator:
  tta: true
  postprocess: true
model:
  path: /models/custom.onnx
  offset: 32
";
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.sample_rate, 44100);
        assert!(config.separator.tta);
        assert!(config.separator.postprocess);
        assert_eq!(config.separator.crop_size, 256);
        assert_eq!(config.model.offset, 32);
        assert_eq!(config.model.resolved_path(), PathBuf::from("/models/custom.onnx"));
        assert_eq!(config.model.input_name, "input");
    }

    #[test]
    fn test_default_model_path_in_cache() {
        let path = ModelConfig::default().resolved_path();
        assert!(path.ends_with("models/baseline.onnx"));
    }
}
