//! Input resolution and HTTP downloads
//!
//! The binary accepts either a local path or an `http(s)://` URL. URLs are
//! fetched into the cache directory before decoding; the same loop is used
//! to fetch a missing model file.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use unmix_core::{Result, SeparationError};

/// Where the audio to separate comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    File(PathBuf),
    Url(String),
}

impl InputSource {
    pub fn parse(input: &str) -> Self {
        if is_url(input) {
            Self::Url(input.to_string())
        } else {
            Self::File(PathBuf::from(input))
        }
    }

    /// Local path of the input, downloading into `download_dir` if needed
    pub fn resolve(&self, download_dir: &Path) -> Result<PathBuf> {
        match self {
            Self::File(path) => Ok(path.clone()),
            Self::Url(url) => {
                let target = download_dir.join(file_name_from_url(url));
                download_file(url, &target)?;
                Ok(target)
            }
        }
    }
}

pub fn is_url(input: &str) -> bool {
    let lower = input.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Last path segment of a URL, stripped of query and unsafe characters
pub fn file_name_from_url(url: &str) -> String {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let path = without_scheme.split(['?', '#']).next().unwrap_or_default();
    let segment = path
        .split_once('/')
        .map(|(_, p)| p.trim_end_matches('/'))
        .and_then(|p| p.rsplit('/').next())
        .unwrap_or_default();

    let name: String = segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if name.is_empty() || name.chars().all(|c| c == '.') {
        String::from("download")
    } else {
        name
    }
}

/// Download `url` to `target_path`
///
/// Writes to a `.tmp` sibling first and renames once the size checks out,
/// so an interrupted download never leaves a truncated file in place.
pub fn download_file(url: &str, target_path: &Path) -> Result<()> {
    if let Some(parent) = target_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = target_path.with_extension("tmp");

    log::info!("Downloading {} to {:?}", url, target_path);

    let response = ureq::get(url)
        .call()
        .map_err(|e| SeparationError::DownloadFailed(format!("{}: {}", url, e)))?;

    let content_length: Option<u64> = response
        .header("Content-Length")
        .and_then(|s| s.parse().ok());

    let mut file = fs::File::create(&temp_path)?;

    let mut reader = response.into_reader();
    let mut buffer = [0u8; 8192];
    let mut downloaded: u64 = 0;
    let mut last_logged_pct = 0u64;

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }

        file.write_all(&buffer[..bytes_read])?;
        downloaded += bytes_read as u64;

        if let Some(total) = content_length.filter(|&t| t > 0) {
            let pct = downloaded * 100 / total;
            if pct >= last_logged_pct + 10 {
                log::debug!("Downloaded {}% ({} / {} bytes)", pct, downloaded, total);
                last_logged_pct = pct;
            }
        }
    }

    file.flush()?;
    drop(file);

    let actual_size = fs::metadata(&temp_path)?.len();

    if let Some(expected) = content_length {
        if actual_size != expected {
            fs::remove_file(&temp_path).ok();
            return Err(SeparationError::DownloadFailed(format!(
                "Download incomplete: expected {} bytes, got {}",
                expected, actual_size
            )));
        }
    }

    fs::rename(&temp_path, target_path)?;

    log::info!("Downloaded {} bytes to {:?}", actual_size, target_path);
    Ok(())
}
