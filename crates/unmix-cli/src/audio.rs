//! Audio file I/O
//!
//! Decoding goes through Symphonia, so any container/codec it supports can
//! be separated. Decoded audio is brought to the model's layout: two planar
//! channels at the configured sample rate. Results are written as 32-bit
//! float WAV via hound.

use std::fs::File;
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavSpec, WavWriter};
use rubato::{FftFixedIn, Resampler};
use unmix_core::ndarray::{Array2, ArrayView2, Axis};
use unmix_core::{Result, SeparationError};

/// Frames fed to the resampler per call
const RESAMPLE_CHUNK: usize = 1024;

/// Planar stereo audio
#[derive(Debug, Clone)]
pub struct StereoAudio {
    /// `(2, num_samples)`
    pub samples: Array2<f32>,
    pub sample_rate: u32,
}

impl StereoAudio {
    pub fn num_samples(&self) -> usize {
        self.samples.len_of(Axis(1))
    }

    pub fn duration_secs(&self) -> f64 {
        self.num_samples() as f64 / self.sample_rate as f64
    }
}

/// Decode `path`, convert to stereo and resample to `target_rate`
pub fn load_stereo(path: &Path, target_rate: u32) -> Result<StereoAudio> {
    let (interleaved, source_rate, channels) = decode_audio(path)?;
    if interleaved.is_empty() {
        return Err(SeparationError::UnsupportedFormat(format!(
            "{} contains no audio samples",
            path.display()
        )));
    }

    let stereo = to_stereo(&interleaved, channels);
    log::info!(
        "Decoded {:?}: {} channels, {} Hz, {} samples",
        path,
        channels,
        source_rate,
        stereo.len_of(Axis(1))
    );

    let samples = resample(stereo, source_rate, target_rate)?;
    Ok(StereoAudio {
        samples,
        sample_rate: target_rate,
    })
}

/// Decode an audio file to interleaved f32 samples using Symphonia
///
/// Returns `(samples, sample_rate, channels)`.
pub fn decode_audio(path: &Path) -> Result<(Vec<f32>, u32, u16)> {
    use symphonia::core::audio::SampleBuffer;
    use symphonia::core::codecs::DecoderOptions;
    use symphonia::core::formats::FormatOptions;
    use symphonia::core::io::MediaSourceStream;
    use symphonia::core::meta::MetadataOptions;
    use symphonia::core::probe::Hint;

    let file = File::open(path).map_err(|e| SeparationError::AudioReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| SeparationError::UnsupportedFormat(e.to_string()))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or_else(|| SeparationError::UnsupportedFormat("No audio track found".to_string()))?;

    let track_id = track.id;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| SeparationError::UnsupportedFormat("Unknown sample rate".to_string()))?;

    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(2);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| SeparationError::UnsupportedFormat(e.to_string()))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                log::warn!("Error reading packet: {}", e);
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(e) => {
                log::warn!("Error decoding packet: {}", e);
                continue;
            }
        };

        if sample_buf.is_none() {
            let spec = *decoded.spec();
            channels = spec.channels.count() as u16;
            sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
        }

        if let Some(ref mut buf) = sample_buf {
            buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(buf.samples());
        }
    }

    Ok((samples, sample_rate, channels))
}

/// Deinterleave into `(2, n)`: mono is duplicated, extra channels dropped
pub fn to_stereo(interleaved: &[f32], channels: u16) -> Array2<f32> {
    let channels = channels.max(1) as usize;
    let frames = interleaved.len() / channels;
    Array2::from_shape_fn((2, frames), |(ch, i)| {
        interleaved[i * channels + ch.min(channels - 1)]
    })
}

/// Resample planar audio from `from` to `to` Hz
///
/// The output holds `ceil(n * to / from)` samples with the resampler's
/// delay removed.
pub fn resample(audio: Array2<f32>, from: u32, to: u32) -> Result<Array2<f32>> {
    if from == to {
        return Ok(audio);
    }

    let (channels, num_samples) = audio.dim();
    let expected = (num_samples as u64 * to as u64).div_ceil(from as u64) as usize;

    let mut resampler =
        FftFixedIn::<f32>::new(from as usize, to as usize, RESAMPLE_CHUNK, 2, channels)
            .map_err(|e| SeparationError::InvalidConfig(format!("Resampler setup failed: {}", e)))?;
    let delay = resampler.output_delay();

    let planar: Vec<Vec<f32>> = audio.outer_iter().map(|ch| ch.to_vec()).collect();
    let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(expected + delay); channels];
    let resample_err =
        |e: rubato::ResampleError| SeparationError::InvalidConfig(format!("Resampling failed: {}", e));

    let mut pos = 0;
    while pos + RESAMPLE_CHUNK <= num_samples {
        let chunk: Vec<&[f32]> = planar.iter().map(|ch| &ch[pos..pos + RESAMPLE_CHUNK]).collect();
        let frames = resampler.process(&chunk, None).map_err(resample_err)?;
        for (out, frame) in output.iter_mut().zip(frames) {
            out.extend(frame);
        }
        pos += RESAMPLE_CHUNK;
    }

    if pos < num_samples {
        let tail: Vec<&[f32]> = planar.iter().map(|ch| &ch[pos..]).collect();
        let frames = resampler
            .process_partial(Some(tail.as_slice()), None)
            .map_err(resample_err)?;
        for (out, frame) in output.iter_mut().zip(frames) {
            out.extend(frame);
        }
    }

    // Flush until the delayed samples are out
    while output[0].len() < expected + delay {
        let frames = resampler
            .process_partial::<&[f32]>(None, None)
            .map_err(resample_err)?;
        if frames[0].is_empty() {
            break;
        }
        for (out, frame) in output.iter_mut().zip(frames) {
            out.extend(frame);
        }
    }

    log::debug!(
        "resample: {} -> {} Hz, {} -> {} samples",
        from,
        to,
        num_samples,
        expected
    );

    Ok(Array2::from_shape_fn((channels, expected), |(ch, i)| {
        output[ch].get(delay + i).copied().unwrap_or(0.0)
    }))
}

/// Write planar audio as a 32-bit float WAV
pub fn write_wav(path: &Path, audio: ArrayView2<'_, f32>, sample_rate: u32) -> Result<PathBuf> {
    let (channels, num_samples) = audio.dim();
    let spec = WavSpec {
        channels: channels as u16,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let stem_err = |e: hound::Error| SeparationError::StemWriteError {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
    };

    let mut writer = WavWriter::create(path, spec).map_err(stem_err)?;
    for i in 0..num_samples {
        for ch in 0..channels {
            writer.write_sample(audio[[ch, i]]).map_err(stem_err)?;
        }
    }
    writer.finalize().map_err(stem_err)?;

    log::info!("Wrote {:?} ({} samples @ {} Hz)", path, num_samples, sample_rate);
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mono_is_duplicated() {
        let stereo = to_stereo(&[0.1, 0.2, 0.3], 1);
        assert_eq!(stereo.dim(), (2, 3));
        assert_eq!(stereo.row(0), stereo.row(1));
        assert_eq!(stereo[[1, 2]], 0.3);
    }

    #[test]
    fn test_extra_channels_are_dropped() {
        // 3 channels, 2 frames
        let stereo = to_stereo(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3);
        assert_eq!(stereo.dim(), (2, 2));
        assert_eq!(stereo[[0, 0]], 1.0);
        assert_eq!(stereo[[1, 0]], 2.0);
        assert_eq!(stereo[[0, 1]], 4.0);
        assert_eq!(stereo[[1, 1]], 5.0);
    }

    #[test]
    fn test_resample_same_rate_is_identity() {
        let audio = Array2::from_shape_fn((2, 100), |(c, i)| (c * 100 + i) as f32);
        let out = resample(audio.clone(), 44100, 44100).unwrap();
        assert_eq!(out, audio);
    }

    #[test]
    fn test_resample_length() {
        let audio = Array2::from_shape_fn((2, 44100), |(_, i)| (i as f32 * 0.01).sin() * 0.5);
        let out = resample(audio, 44100, 22050).unwrap();
        assert_eq!(out.dim(), (2, 22050));
    }

    #[test]
    fn test_wav_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let audio = Array2::from_shape_fn((2, 500), |(c, i)| {
            (i as f32 * 0.05).sin() * if c == 0 { 0.5 } else { 0.25 }
        });

        write_wav(&path, audio.view(), 22050).unwrap();
        let loaded = load_stereo(&path, 22050).unwrap();

        assert_eq!(loaded.sample_rate, 22050);
        assert_eq!(loaded.samples.dim(), (2, 500));
        for (a, b) in audio.iter().zip(loaded.samples.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_missing_file() {
        let result = load_stereo(Path::new("/nonexistent/input.wav"), 22050);
        assert!(matches!(result, Err(SeparationError::AudioReadError { .. })));
    }
}
