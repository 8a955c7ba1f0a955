//! Configuration utilities
//!
//! - Generic YAML config loading/saving
//! - Default locations for the config file and model cache
//!
//! # Usage
//!
//! ```ignore
//! use unmix_core::config::{default_config_path, load_config, save_config};
//!
//! let config: MyAppConfig = load_config(&default_config_path());
//! save_config(&config, &default_config_path())?;
//! ```

mod io;
mod paths;

pub use io::{load_config, save_config, try_load_config};
pub use paths::{default_cache_dir, default_config_path, APP_DIR};
