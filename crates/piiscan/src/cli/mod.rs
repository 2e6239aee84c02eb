pub mod scan;

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use piiscan_core::{ConfigError, ScanConfig, ScanMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DetectorKind {
    /// AWS Comprehend PII detection
    Comprehend,
    /// Offline regular expressions for SSN shapes
    Pattern,
}

#[derive(Debug, Parser)]
#[command(
    name = "piiscan",
    about = "Find social security numbers in PDF documents",
    version
)]
pub struct Cli {
    /// PDF file or directory to scan
    pub target: PathBuf,
    /// Directory that receives PII_Matches.csv
    pub report_dir: PathBuf,
    /// Scan one PDF file instead of a directory tree
    #[arg(short, long)]
    pub single: bool,
    /// TOML file with [detector] and [scan] settings
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = DetectorKind::Comprehend)]
    pub detector: DetectorKind,
    /// Entity type written to the report
    #[arg(long, value_name = "TYPE")]
    pub target_type: Option<String>,
    /// Language code sent to the detector
    #[arg(long)]
    pub language: Option<String>,
    #[arg(long)]
    pub region: Option<String>,
    /// Alternate detector endpoint (e.g. a VPC endpoint)
    #[arg(long, value_name = "URL")]
    pub endpoint_url: Option<String>,
    /// Documents scanned concurrently
    #[arg(short, long)]
    pub jobs: Option<usize>,
    /// Largest text segment sent in one detector call, in bytes
    #[arg(long, value_name = "BYTES")]
    pub segment_bytes: Option<usize>,
    /// Append-only diagnostic log
    #[arg(long, value_name = "PATH", default_value = "PII_Logging.log")]
    pub log_file: PathBuf,
}

impl Cli {
    pub const fn mode(&self) -> ScanMode {
        if self.single {
            ScanMode::Single
        } else {
            ScanMode::Recursive
        }
    }

    /// Settings from `--config` (or defaults) with command-line overrides applied.
    pub fn scan_config(&self) -> Result<ScanConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => ScanConfig::from_file(path)?,
            None => ScanConfig::default(),
        };

        if let Some(region) = &self.region {
            config.detector.region.clone_from(region);
        }
        if let Some(url) = &self.endpoint_url {
            config.detector.endpoint_url = Some(url.clone());
        }
        if let Some(target_type) = &self.target_type {
            config.scan.target_type.clone_from(target_type);
        }
        if let Some(language) = &self.language {
            config.scan.language.clone_from(language);
        }
        if let Some(jobs) = self.jobs {
            config.scan.jobs = jobs;
        }
        if let Some(bytes) = self.segment_bytes {
            config.scan.segment_bytes = bytes;
        }

        config.detector.validate()?;
        Ok(config)
    }
}
