//! Hashing run configuration.

use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Size of each read fed into the hasher.
pub const DEFAULT_CHUNK_SIZE: usize = 128 * 1024;

/// Lower bound of the worker-count policy.
pub const DEFAULT_MIN_WORKERS: usize = 2;

/// Upper bound of the worker-count policy.
pub const DEFAULT_MAX_WORKERS: usize = 32;

/// Configuration for a hashing run.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
#[serde(default)]
pub struct HashConfig {
    /// Requested worker count (None = derive from available parallelism).
    #[builder(default, setter(strip_option))]
    pub workers: Option<usize>,

    /// Floor of the worker-count policy.
    #[builder(default = "DEFAULT_MIN_WORKERS")]
    pub min_workers: usize,

    /// Ceiling of the worker-count policy.
    #[builder(default = "DEFAULT_MAX_WORKERS")]
    pub max_workers: usize,

    /// Bytes read per chunk.
    #[builder(default = "DEFAULT_CHUNK_SIZE")]
    pub chunk_size: usize,

    /// Descend into symlinked directories and hash symlinked files.
    #[builder(default = "true")]
    pub follow_symlinks: bool,

    /// Include hidden files (starting with .) found while walking directories.
    #[builder(default = "true")]
    pub include_hidden: bool,
}

impl HashConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        let min = self.min_workers.unwrap_or(DEFAULT_MIN_WORKERS);
        let max = self.max_workers.unwrap_or(DEFAULT_MAX_WORKERS);
        check_bounds(min, max, self.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE))
    }
}

fn check_bounds(min_workers: usize, max_workers: usize, chunk_size: usize) -> Result<(), String> {
    if min_workers == 0 {
        return Err("min_workers must be at least 1".to_string());
    }
    if min_workers > max_workers {
        return Err(format!(
            "min_workers ({min_workers}) exceeds max_workers ({max_workers})"
        ));
    }
    if chunk_size == 0 {
        return Err("chunk_size must be greater than zero".to_string());
    }
    Ok(())
}

/// Clamp a worker count into `[min, max]`.
pub fn clamp_workers(requested: usize, min: usize, max: usize) -> usize {
    requested.clamp(min, max)
}

impl HashConfig {
    /// Create a new config builder.
    pub fn builder() -> HashConfigBuilder {
        HashConfigBuilder::default()
    }

    /// Worker count to use given the machine's available parallelism.
    ///
    /// An explicit override is clamped by the same policy as the detected value.
    pub fn effective_workers(&self, available_parallelism: usize) -> usize {
        let requested = self.workers.unwrap_or(available_parallelism);
        clamp_workers(requested, self.min_workers, self.max_workers)
    }

    /// Check that the configured values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_bounds(self.min_workers, self.max_workers, self.chunk_size)
            .map_err(|message| ConfigError::Invalid { message })
    }

    /// Default location of the user config file.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("digestpool").join("config.toml"))
    }

    /// Load the user config file, or defaults when there is none.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::config_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parse and validate TOML config content.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            workers: None,
            min_workers: DEFAULT_MIN_WORKERS,
            max_workers: DEFAULT_MAX_WORKERS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            follow_symlinks: true,
            include_hidden: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = HashConfig::builder()
            .workers(4usize)
            .chunk_size(4096usize)
            .follow_symlinks(false)
            .build()
            .unwrap();

        assert_eq!(config.workers, Some(4));
        assert_eq!(config.chunk_size, 4096);
        assert!(!config.follow_symlinks);
        assert_eq!(config.min_workers, DEFAULT_MIN_WORKERS);
        assert_eq!(config.max_workers, DEFAULT_MAX_WORKERS);
    }

    #[test]
    fn test_builder_rejects_inverted_bounds() {
        let result = HashConfig::builder()
            .min_workers(8usize)
            .max_workers(4usize)
            .build();
        assert!(result.is_err());

        let result = HashConfig::builder().chunk_size(0usize).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_effective_workers_clamps() {
        let config = HashConfig::default();
        assert_eq!(config.effective_workers(1), 2);
        assert_eq!(config.effective_workers(8), 8);
        assert_eq!(config.effective_workers(128), 32);

        let config = HashConfig::builder().workers(0usize).build().unwrap();
        assert_eq!(config.effective_workers(16), 2);

        let config = HashConfig::builder().workers(500usize).build().unwrap();
        assert_eq!(config.effective_workers(16), 32);
    }

    #[test]
    fn test_from_toml_partial() {
        let config = HashConfig::from_toml_str("workers = 6\nfollow_symlinks = false\n").unwrap();
        assert_eq!(config.workers, Some(6));
        assert!(!config.follow_symlinks);
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn test_from_toml_invalid() {
        assert!(matches!(
            HashConfig::from_toml_str("min_workers = 0\n"),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            HashConfig::from_toml_str("workers = \"many\"\n"),
            Err(ConfigError::Parse { .. })
        ));
    }
}
