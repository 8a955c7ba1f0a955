//! Command line parsing

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::settings::AppConfig;

pub const USAGE: &str = "\
Usage: unmix <INPUT> [OPTIONS]

Split a song into instruments.wav and vocals.wav.
INPUT is a local audio file or an http(s) URL.

Options:
  -o, --output <DIR>     Output directory
  -c, --config <FILE>    Config file (default: ~/.config/unmix/config.yaml)
  -m, --model <FILE>     Model file
      --tta              Average a second, half-stride shifted pass
      --postprocess      Suppress isolated mask artifacts
      --batch-size <N>   Patches per inference call
      --crop-size <N>    Frames per patch including context
      --threads <N>      Inference worker threads (0 = all cores)
      --save-config      Write the effective config to the config file and exit
  -h, --help             Print help";

/// Parsed command line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliArgs {
    pub input: String,
    pub config_path: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub model_path: Option<PathBuf>,
    pub tta: bool,
    pub postprocess: bool,
    pub batch_size: Option<usize>,
    pub crop_size: Option<usize>,
    pub threads: Option<usize>,
    pub save_config: bool,
    pub help: bool,
}

impl CliArgs {
    /// Parse arguments (without the program name)
    pub fn parse<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut parsed = Self::default();
        let mut input = None;
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            let mut value = |name: &str| {
                args.next()
                    .with_context(|| format!("{} requires a value", name))
            };

            match arg.as_str() {
                "-h" | "--help" => parsed.help = true,
                "--tta" => parsed.tta = true,
                "--postprocess" => parsed.postprocess = true,
                "--save-config" => parsed.save_config = true,
                "-o" | "--output" => parsed.output_dir = Some(value(&arg)?.into()),
                "-c" | "--config" => parsed.config_path = Some(value(&arg)?.into()),
                "-m" | "--model" => parsed.model_path = Some(value(&arg)?.into()),
                "--batch-size" => parsed.batch_size = Some(parse_count(&arg, &value(&arg)?)?),
                "--crop-size" => parsed.crop_size = Some(parse_count(&arg, &value(&arg)?)?),
                "--threads" => parsed.threads = Some(parse_count(&arg, &value(&arg)?)?),
                flag if flag.starts_with('-') && flag.len() > 1 => bail!("Unknown option: {}", flag),
                _ => {
                    if input.replace(arg.clone()).is_some() {
                        bail!("Only one input may be given");
                    }
                }
            }
        }

        match input {
            Some(input) => parsed.input = input,
            None if parsed.help || parsed.save_config => {}
            None => bail!("Missing input file or URL"),
        }
        Ok(parsed)
    }

    /// Apply command line overrides on top of the loaded config
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(path) = &self.model_path {
            config.model.path = Some(path.clone());
        }
        if self.tta {
            config.separator.tta = true;
        }
        if self.postprocess {
            config.separator.postprocess = true;
        }
        if let Some(n) = self.batch_size {
            config.separator.batch_size = n;
        }
        if let Some(n) = self.crop_size {
            config.separator.crop_size = n;
        }
        if let Some(n) = self.threads {
            config.threads = n;
        }
    }
}

fn parse_count(flag: &str, value: &str) -> Result<usize> {
    value
        .parse()
        .with_context(|| format!("{} expects a number, got '{}'", flag, value))
}
