//! Separation configuration types

use serde::{Deserialize, Serialize};

use super::error::{Result, SeparationError};

/// Configuration for the patch-based separation engine
///
/// The model's context margin is not configured here; it is a property of
/// the model and read from [`MaskModel::offset`](super::MaskModel::offset).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeparatorConfig {
    /// Crops per model call (throughput/memory trade-off, never affects output)
    pub batch_size: usize,

    /// Patch width in frames, must exceed twice the model offset
    pub crop_size: usize,

    /// Run the artifact filter on the mask before splitting
    pub postprocess: bool,

    /// Average a second, half-stride shifted inference pass
    pub tta: bool,

    /// Artifact filter settings (used when `postprocess` is set)
    pub artifacts: ArtifactConfig,
}

impl Default for SeparatorConfig {
    fn default() -> Self {
        Self {
            batch_size: 4,
            crop_size: 256,
            postprocess: false,
            tta: false,
            artifacts: ArtifactConfig::default(),
        }
    }
}

impl SeparatorConfig {
    /// Check values against a model's context margin
    pub fn validate(&self, offset: usize) -> Result<()> {
        if self.batch_size == 0 {
            return Err(SeparationError::InvalidConfig(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if self.crop_size <= 2 * offset {
            return Err(SeparationError::InvalidConfig(format!(
                "crop_size ({}) must exceed twice the model offset ({})",
                self.crop_size, offset
            )));
        }
        self.artifacts.validate()
    }
}

/// Artifact filter settings
///
/// Regions of the mask above `threshold` that span at most `max_frames`
/// frames and `max_bins` bins are treated as spurious detections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Mask magnitude above which a cell counts as a confident detection
    pub threshold: f32,
    /// Longest time extent (frames) an island may have
    pub max_frames: usize,
    /// Widest frequency extent (bins) an island may have
    pub max_bins: usize,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            max_frames: 8,
            max_bins: 16,
        }
    }
}

impl ArtifactConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(SeparationError::InvalidConfig(format!(
                "artifact threshold must be a non-negative number, got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = SeparatorConfig::default();
        assert_eq!(config.batch_size, 4);
        assert_eq!(config.crop_size, 256);
        assert!(!config.postprocess);
        assert!(config.validate(64).is_ok());
    }

    #[test]
    fn test_validate_rejects_small_crop() {
        let config = SeparatorConfig {
            crop_size: 128,
            ..Default::default()
        };
        assert!(config.validate(64).is_err());
        assert!(config.validate(63).is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_batch() {
        let config = SeparatorConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(0),
            Err(SeparationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config: SeparatorConfig = serde_yaml::from_str("batch_size: 16\ntta: true\n").unwrap();
        assert_eq!(config.batch_size, 16);
        assert!(config.tta);
        assert_eq!(config.crop_size, 256);
        assert_eq!(config.artifacts, ArtifactConfig::default());
    }
}
