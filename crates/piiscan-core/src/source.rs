use std::path::{Path, PathBuf};

use glob::MatchOptions;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum UsageError {
    #[error("Invalid directory or file path entered for scan target: {0}")]
    NotFound(PathBuf),
    #[error("Please target a single PDF file when running with the --single option ({0} is a directory)")]
    SingleModeDirectory(PathBuf),
    #[error("{0} is a file; pass --single to scan a single PDF file")]
    DirectoryModeFile(PathBuf),
    #[error("Invalid search pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    Single,
    Recursive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanTarget {
    File(PathBuf),
    Directory(PathBuf),
}

impl ScanTarget {
    pub fn resolve(path: &Path, mode: ScanMode) -> Result<Self, UsageError> {
        match mode {
            ScanMode::Single if path.is_file() => Ok(Self::File(path.to_path_buf())),
            ScanMode::Single if path.is_dir() => Err(UsageError::SingleModeDirectory(path.to_path_buf())),
            ScanMode::Recursive if path.is_dir() => Ok(Self::Directory(path.to_path_buf())),
            ScanMode::Recursive if path.is_file() => Err(UsageError::DirectoryModeFile(path.to_path_buf())),
            _ => Err(UsageError::NotFound(path.to_path_buf())),
        }
    }

    pub fn root(&self) -> &Path {
        match self {
            Self::File(path) | Self::Directory(path) => path,
        }
    }

    /// Documents to scan, sorted so repeated runs visit them in the same order.
    pub fn discover(&self, extension: &str) -> Result<Vec<PathBuf>, UsageError> {
        let root = match self {
            Self::File(path) => return Ok(vec![path.clone()]),
            Self::Directory(root) => root,
        };

        let pattern = format!(
            "{}/**/*.{}",
            glob::Pattern::escape(&root.to_string_lossy()),
            extension
        );
        let options = MatchOptions {
            case_sensitive: false,
            ..MatchOptions::new()
        };

        let mut documents = Vec::new();
        for entry in glob::glob_with(&pattern, options)? {
            match entry {
                Ok(path) if path.is_file() => documents.push(path),
                Ok(_) => {}
                Err(e) => warn!(path = %e.path().display(), error = %e.error(), "unreadable path during discovery"),
            }
        }

        documents.sort();
        Ok(documents)
    }

    /// Name recorded in the report: the file name for a single-file scan,
    /// the path relative to the scanned directory otherwise.
    pub fn source_name(&self, document: &Path) -> String {
        let name = match self {
            Self::Directory(root) => document.strip_prefix(root).ok(),
            Self::File(_) => None,
        };

        name.or_else(|| document.file_name().map(Path::new))
            .unwrap_or(document)
            .to_string_lossy()
            .into_owned()
    }
}
