//! Separation service - runs one input file through the whole pipeline
//!
//! ```text
//! input ─► decode/resample ─► STFT ─► Separator ─► ISTFT ─► instruments.wav
//!                                                       └─► vocals.wav
//! ```
//!
//! The mask selects the instrumental part; the vocal track is what remains.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use unmix_core::separation::SplitSpectrograms;
use unmix_core::stft::{spectrogram_to_wave, wave_to_spectrogram};
use unmix_core::{MaskModel, Result, SeparationError, Separator};

use crate::audio::{load_stereo, write_wav};
use crate::backend::load_model;
use crate::fetch::{download_file, InputSource};
use crate::settings::AppConfig;

/// Stem written for the masked part
pub const INSTRUMENTS_FILE: &str = "instruments.wav";
/// Stem written for the residual
pub const VOCALS_FILE: &str = "vocals.wav";

/// Progress stage during separation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeparationStage {
    /// Fetching a remote input
    Downloading,
    /// Decoding and resampling
    Decoding,
    /// Mask inference and splitting
    Separating,
    /// Writing the two WAV files
    Writing,
    /// Finished
    Complete,
}

/// Callback for separation progress (uses Arc for cloneability)
pub type ServiceProgressCallback = Arc<dyn Fn(SeparationStage) + Send + Sync>;

/// Paths of the two written stems
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeparationOutput {
    pub instruments_file: PathBuf,
    pub vocals_file: PathBuf,
}

/// Main service for two-stem separation
///
/// Example usage:
/// ```ignore
/// let service = SeparationService::new(AppConfig::default())?;
/// let output = service.separate_file(Path::new("song.mp3"), Path::new("out"), None)?;
/// ```
pub struct SeparationService {
    config: AppConfig,
    separator: Separator,
    pool: Option<rayon::ThreadPool>,
}

impl SeparationService {
    /// Create a service, fetching and loading the configured model
    pub fn new(mut config: AppConfig) -> Result<Self> {
        config.validate();
        let model_path = ensure_model(&config)?;
        let model = load_model(&model_path, &config.model)?;
        Self::with_model(config, model)
    }

    /// Create a service around an already loaded model
    pub fn with_model(mut config: AppConfig, model: Arc<dyn MaskModel>) -> Result<Self> {
        config.validate();
        config.stft.validate()?;
        let separator = Separator::new(model, config.separator.clone())?;

        let pool = if config.threads > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.threads)
                .build()
                .map_err(|e| SeparationError::InvalidConfig(format!("Thread pool: {}", e)))?;
            Some(pool)
        } else {
            None
        };

        Ok(Self {
            config,
            separator,
            pool,
        })
    }

    /// Get current configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Separate a local file or URL
    pub fn separate(
        &self,
        source: &InputSource,
        output_dir: &Path,
        progress: Option<ServiceProgressCallback>,
    ) -> Result<SeparationOutput> {
        if matches!(source, InputSource::Url(_)) {
            report(&progress, SeparationStage::Downloading);
        }
        let download_dir = unmix_core::config::default_cache_dir().join("downloads");
        let input_path = source.resolve(&download_dir)?;
        self.separate_file(&input_path, output_dir, progress)
    }

    /// Separate a local audio file into `output_dir`
    pub fn separate_file(
        &self,
        input_path: &Path,
        output_dir: &Path,
        progress: Option<ServiceProgressCallback>,
    ) -> Result<SeparationOutput> {
        report(&progress, SeparationStage::Decoding);
        let audio = load_stereo(input_path, self.config.sample_rate)?;
        let num_samples = audio.num_samples();
        log::info!(
            "Separating {:?} ({:.1}s @ {} Hz)",
            input_path,
            audio.duration_secs(),
            audio.sample_rate
        );

        report(&progress, SeparationStage::Separating);
        let spec = wave_to_spectrogram(audio.samples.view(), &self.config.stft)?;
        let SplitSpectrograms { target, residual } = match &self.pool {
            Some(pool) => pool.install(|| self.separator.run(spec.view()))?,
            None => self.separator.run(spec.view())?,
        };

        report(&progress, SeparationStage::Writing);
        let instruments = spectrogram_to_wave(target.view(), &self.config.stft, num_samples)?;
        let vocals = spectrogram_to_wave(residual.view(), &self.config.stft, num_samples)?;

        fs::create_dir_all(output_dir)?;
        let output = SeparationOutput {
            instruments_file: write_wav(
                &output_dir.join(INSTRUMENTS_FILE),
                instruments.view(),
                audio.sample_rate,
            )?,
            vocals_file: write_wav(&output_dir.join(VOCALS_FILE), vocals.view(), audio.sample_rate)?,
        };

        report(&progress, SeparationStage::Complete);
        Ok(output)
    }
}

/// Path of the configured model, downloading it first if a URL is set
pub fn ensure_model(config: &AppConfig) -> Result<PathBuf> {
    let path = config.model.resolved_path();
    if path.exists() {
        return Ok(path);
    }

    match &config.model.url {
        Some(url) => {
            log::info!("Model not found at {:?}, fetching from {}", path, url);
            download_file(url, &path)?;
            Ok(path)
        }
        None => Err(SeparationError::ModelNotFound(path.display().to_string())),
    }
}

fn report(progress: &Option<ServiceProgressCallback>, stage: SeparationStage) {
    log::debug!("Separation stage: {:?}", stage);
    if let Some(cb) = progress {
        cb(stage);
    }
}
