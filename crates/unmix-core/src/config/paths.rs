//! Standard locations for unmix files

use std::path::PathBuf;

/// Directory name used under the platform config and cache roots
pub const APP_DIR: &str = "unmix";

/// Get the default config file path
///
/// Returns: `{config_dir}/unmix/config.yaml` (e.g. `~/.config/unmix/config.yaml`),
/// falling back to the working directory when the platform has no config dir.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("config.yaml")
}

/// Get the default cache directory for downloaded models and inputs
///
/// Returns: `{cache_dir}/unmix` (e.g. `~/.cache/unmix`)
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_ends_with_app_file() {
        let path = default_config_path();
        assert!(path.ends_with("unmix/config.yaml"));
    }

    #[test]
    fn test_cache_dir_ends_with_app_dir() {
        assert!(default_cache_dir().ends_with(APP_DIR));
    }
}
