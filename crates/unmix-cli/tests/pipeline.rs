//! File-to-file separation with a stub model

use std::path::Path;
use std::sync::{Arc, Mutex};

use unmix_cli::audio::{load_stereo, write_wav};
use unmix_cli::service::{
    SeparationService, SeparationStage, ServiceProgressCallback, INSTRUMENTS_FILE, VOCALS_FILE,
};
use unmix_cli::settings::AppConfig;
use unmix_core::ndarray::{Array2, Array4, ArrayView4};
use unmix_core::{Complex32, MaskModel, Result, SeparatorConfig, StftConfig};

/// Sends a fixed share of every bin to the target
struct ConstantMask(f32);

impl MaskModel for ConstantMask {
    fn name(&self) -> &str {
        "constant"
    }

    fn offset(&self) -> usize {
        4
    }

    fn predict_mask(&self, batch: ArrayView4<'_, Complex32>) -> Result<Array4<Complex32>> {
        Ok(Array4::from_elem(batch.raw_dim(), Complex32::new(self.0, 0.0)))
    }
}

fn test_config(tta: bool) -> AppConfig {
    AppConfig {
        separator: SeparatorConfig {
            crop_size: 32,
            batch_size: 3,
            tta,
            ..Default::default()
        },
        stft: StftConfig {
            n_fft: 512,
            hop_length: 128,
        },
        sample_rate: 22050,
        threads: 2,
        ..Default::default()
    }
}

fn write_mono_tone(path: &Path, sample_rate: u32, seconds: f32) {
    let n = (sample_rate as f32 * seconds) as usize;
    let tone = Array2::from_shape_fn((1, n), |(_, i)| {
        let t = i as f32 / sample_rate as f32;
        0.4 * (2.0 * std::f32::consts::PI * 440.0 * t).sin()
            + 0.2 * (2.0 * std::f32::consts::PI * 1250.0 * t).sin()
    });
    write_wav(path, tone.view(), sample_rate).unwrap();
}

#[test]
fn separates_file_into_two_stems() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("song.wav");
    write_mono_tone(&input, 44100, 1.0);

    for tta in [false, true] {
        let out_dir = dir.path().join(format!("out-{}", tta));
        let service = SeparationService::with_model(test_config(tta), Arc::new(ConstantMask(0.75)))
            .unwrap();
        let output = service.separate_file(&input, &out_dir, None).unwrap();

        assert_eq!(output.instruments_file, out_dir.join(INSTRUMENTS_FILE));
        assert_eq!(output.vocals_file, out_dir.join(VOCALS_FILE));

        let mixture = load_stereo(&input, 22050).unwrap();
        let instruments = load_stereo(&output.instruments_file, 22050).unwrap();
        let vocals = load_stereo(&output.vocals_file, 22050).unwrap();

        assert_eq!(instruments.samples.dim(), mixture.samples.dim());
        assert_eq!(vocals.samples.dim(), mixture.samples.dim());

        // the two stems add back up to the (resampled) mixture
        let mut max_err = 0.0f32;
        for ((m, i), v) in mixture
            .samples
            .iter()
            .zip(instruments.samples.iter())
            .zip(vocals.samples.iter())
        {
            max_err = max_err.max((i + v - m).abs());
        }
        assert!(max_err < 1e-3, "tta={} reconstruction error {}", tta, max_err);

        // a constant 0.75 mask sends three times as much energy to the target
        let energy = |a: &Array2<f32>| a.iter().map(|x| x * x).sum::<f32>();
        let ratio = energy(&instruments.samples) / energy(&vocals.samples);
        assert!((ratio - 9.0).abs() < 0.1, "energy ratio {}", ratio);
    }
}

#[test]
fn reports_progress_stages_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("short.wav");
    write_mono_tone(&input, 22050, 0.25);

    let stages = Arc::new(Mutex::new(Vec::new()));
    let sink = stages.clone();
    let callback: ServiceProgressCallback =
        Arc::new(move |stage: SeparationStage| sink.lock().unwrap().push(stage));
    let service =
        SeparationService::with_model(test_config(false), Arc::new(ConstantMask(0.5))).unwrap();
    service
        .separate_file(
            &input,
            &dir.path().join("out"),
            Some(callback),
        )
        .unwrap();

    assert_eq!(
        *stages.lock().unwrap(),
        vec![
            SeparationStage::Decoding,
            SeparationStage::Separating,
            SeparationStage::Writing,
            SeparationStage::Complete,
        ]
    );
}

#[test]
fn rejects_config_the_model_cannot_run() {
    let mut config = test_config(false);
    config.separator.crop_size = 8;
    assert!(SeparationService::with_model(config, Arc::new(ConstantMask(0.5))).is_err());
}
