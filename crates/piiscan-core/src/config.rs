use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ingest::ScanOptions;
use crate::network::{DetectorConfig, DetectorConfigError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid detector settings: {0}")]
    Detector(#[from] DetectorConfigError),
}

/// Settings loaded from a `--config` TOML file.
///
/// ```toml
/// [detector]
/// region = "us-west-2"
/// max_in_flight = 8
///
/// [detector.retry]
/// max_attempts = 3
///
/// [scan]
/// jobs = 4
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub detector: DetectorConfig,
    pub scan: ScanOptions,
}

impl ScanConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.detector.validate()?;
        Ok(config)
    }
}
