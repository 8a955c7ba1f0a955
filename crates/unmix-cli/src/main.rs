//! unmix - split a song into instrumental and vocal tracks
//!
//! Prints `{"instruments_file": ..., "vocals_file": ...}` on success.
//! Logs go to stderr; set RUST_LOG=debug for per-pass detail.

use anyhow::{Context, Result};
use unmix_cli::args::{CliArgs, USAGE};
use unmix_cli::fetch::InputSource;
use unmix_cli::service::SeparationService;
use unmix_cli::settings::AppConfig;
use unmix_core::config::{default_config_path, load_config, save_config};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = match CliArgs::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {:#}\n\n{}", e, USAGE);
            std::process::exit(2);
        }
    };
    if args.help {
        println!("{}", USAGE);
        return Ok(());
    }

    let config_path = args.config_path.clone().unwrap_or_else(default_config_path);
    let mut config: AppConfig = load_config(&config_path);
    args.apply(&mut config);

    if args.save_config {
        save_config(&config, &config_path)?;
        println!("{}", config_path.display());
        return Ok(());
    }

    log::info!(
        "unmix starting: input={}, output_dir={:?}, tta={}, postprocess={}",
        args.input,
        config.output_dir,
        config.separator.tta,
        config.separator.postprocess
    );

    let output_dir = config.output_dir.clone();
    let service = SeparationService::new(config).context("Failed to initialize separation")?;
    let output = service
        .separate(&InputSource::parse(&args.input), &output_dir, None)
        .with_context(|| format!("Failed to separate {}", args.input))?;

    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}
