use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;
use thiserror::Error;

use crate::entity::EntityMatch;

pub const REPORT_FILE_NAME: &str = "PII_Matches.csv";

pub const COLUMNS: [&str; 7] = [
    "Score",
    "Type",
    "BeginOffset",
    "EndOffset",
    "String",
    "Filename",
    "Page",
];

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Invalid directory path entered for report directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Cannot open report {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Report writer lock poisoned")]
    Poisoned,
}

/// One persisted match. Offsets are character offsets into the page text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    #[serde(rename = "Score")]
    pub score: f64,
    #[serde(rename = "Type")]
    pub entity_type: String,
    #[serde(rename = "BeginOffset")]
    pub begin_offset: usize,
    #[serde(rename = "EndOffset")]
    pub end_offset: usize,
    #[serde(rename = "String")]
    pub matched_string: String,
    #[serde(rename = "Filename")]
    pub source_file: String,
    #[serde(rename = "Page")]
    pub page: u32,
}

impl ReportRow {
    /// Converts segment-local offsets to page offsets using the segment's
    /// starting character position.
    #[must_use]
    pub fn from_match(found: EntityMatch, page: u32, segment_char_offset: usize) -> Self {
        Self {
            score: found.score,
            entity_type: found.entity_type,
            begin_offset: segment_char_offset + found.begin_offset,
            end_offset: segment_char_offset + found.end_offset,
            matched_string: found.matched_string,
            source_file: found.source_file,
            page,
        }
    }
}

struct ReportState {
    writer: csv::Writer<Box<dyn Write + Send>>,
    rows: u64,
}

/// Append-only CSV report shared by all scan workers.
///
/// Every row is flushed as soon as it is written, under a lock, so rows
/// from different workers never interleave and an interrupted scan leaves
/// only complete lines behind.
pub struct ReportWriter {
    state: Mutex<ReportState>,
    path: PathBuf,
}

impl ReportWriter {
    /// Opens `PII_Matches.csv` inside `dir` for appending and writes the header.
    pub fn open_in(dir: &Path) -> Result<Self, ReportError> {
        if !dir.is_dir() {
            return Err(ReportError::NotADirectory(dir.to_path_buf()));
        }
        Self::open(&dir.join(REPORT_FILE_NAME))
    }

    pub fn open(path: &Path) -> Result<Self, ReportError> {
        let file: File = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| ReportError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        let sink: Box<dyn Write + Send> = Box::new(file);
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(sink);
        writer.write_record(COLUMNS)?;
        writer.flush()?;

        Ok(Self {
            state: Mutex::new(ReportState { writer, rows: 0 }),
            path: path.to_path_buf(),
        })
    }

    pub fn write_row(&self, row: &ReportRow) -> Result<(), ReportError> {
        let mut state = self.state.lock().map_err(|_| ReportError::Poisoned)?;
        state.writer.serialize(row)?;
        state.writer.flush()?;
        state.rows += 1;
        Ok(())
    }

    /// Rows written through this writer (excludes rows from earlier runs).
    pub fn rows_written(&self) -> u64 {
        self.state.lock().map_or(0, |state| state.rows)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
