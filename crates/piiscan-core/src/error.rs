use thiserror::Error;

use crate::config::ConfigError;
use crate::ingest::{DetectionError, SegmentError};
use crate::network::DetectorConfigError;
use crate::report::ReportError;
use crate::source::UsageError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Usage(#[from] UsageError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid detector configuration: {0}")]
    DetectorConfig(#[from] DetectorConfigError),

    #[error("Invalid scan options: {0}")]
    Segment(#[from] SegmentError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("Detection failed for {file} page {page} segment {segment}: {source}")]
    Detection {
        file: String,
        page: u32,
        segment: usize,
        #[source]
        source: DetectionError,
    },

    #[error("Scan worker failed: {0}")]
    Worker(String),
}

impl Error {
    /// Errors caused by how the scanner was invoked rather than by the corpus
    /// or the detector.
    #[must_use]
    pub const fn is_usage(&self) -> bool {
        matches!(
            self,
            Self::Usage(_)
                | Self::Config(_)
                | Self::DetectorConfig(_)
                | Self::Segment(_)
                | Self::Report(ReportError::NotADirectory(_))
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_usage_classification() {
        let usage: Error = UsageError::NotFound(PathBuf::from("missing")).into();
        let report: Error = ReportError::NotADirectory(PathBuf::from("missing")).into();
        let detection = Error::Detection {
            file: "a.pdf".into(),
            page: 1,
            segment: 0,
            source: DetectionError::Credentials("denied".into()),
        };

        assert!(usage.is_usage());
        assert!(report.is_usage());
        assert!(!detection.is_usage());
    }

    #[test]
    fn test_detection_message_names_location() {
        let err = Error::Detection {
            file: "dir/a.pdf".into(),
            page: 4,
            segment: 2,
            source: DetectionError::Rejected("bad request".into()),
        };

        let message = err.to_string();

        assert!(message.contains("dir/a.pdf"));
        assert!(message.contains("page 4"));
        assert!(message.contains("segment 2"));
    }
}
