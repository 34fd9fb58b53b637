use crate::checksum::ChecksumEngine;
use crate::filter::DEFAULT_EXCLUDED_NAMES;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Optional configuration file inside the store root.
pub const CONFIG_FILENAME: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(std::io::Error),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Checksum buffer size must be greater than zero")]
    ZeroBufferSize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    scan: ScanSection,
    #[serde(default)]
    checksum: ChecksumSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScanSection {
    /// Names excluded in addition to the built-in defaults.
    #[serde(default)]
    exclude: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ChecksumSection {
    buffer_size: Option<usize>,
}

/// Effective scan settings for one invocation: built-in defaults, then the
/// store's `config.toml` if present, then names passed on the command line.
#[derive(Debug, Clone)]
pub struct Config {
    pub excluded_names: Vec<String>,
    pub buffer_size: usize,
}

impl Config {
    pub fn load(store_root: &Path, extra_excludes: &[String]) -> Result<Config, ConfigError> {
        let config_path = store_root.join(CONFIG_FILENAME);
        let file = read_config_file(&config_path)?;

        let mut excluded_names: Vec<String> = DEFAULT_EXCLUDED_NAMES
            .iter()
            .map(|name| name.to_string())
            .collect();
        excluded_names.extend(file.scan.exclude);
        excluded_names.extend(extra_excludes.iter().cloned());

        let buffer_size = file
            .checksum
            .buffer_size
            .unwrap_or(ChecksumEngine::DEFAULT_BUFFER_SIZE);
        if buffer_size == 0 {
            return Err(ConfigError::ZeroBufferSize);
        }

        Ok(Config {
            excluded_names,
            buffer_size,
        })
    }
}

fn read_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No config file at {}", path.display());
            return Ok(ConfigFile::default());
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ConfigError::PermissionDenied(path.to_path_buf()));
        }
        Err(e) => return Err(ConfigError::Io(e)),
    };

    Ok(toml::from_str(&content)?)
}
