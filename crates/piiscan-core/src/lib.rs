pub mod config;
pub mod entity;
pub mod error;
pub mod ingest;
pub mod network;
pub mod report;
pub mod source;

pub use config::{ConfigError, ScanConfig};
pub use entity::{DetectedEntity, EntityMatch, SSN};
pub use error::{Error, Result};
pub use ingest::{
    DetectionError, EntityDetector, PatternDetector, PdfTextSource, ScanOptions, ScanSummary,
    Scanner, Segmenter, StopSignal, TextSource,
};
pub use network::{guarded, ComprehendDetector, DetectorConfig, RetryPolicy};
pub use report::{ReportError, ReportRow, ReportWriter, REPORT_FILE_NAME};
pub use source::{ScanMode, ScanTarget, UsageError};
