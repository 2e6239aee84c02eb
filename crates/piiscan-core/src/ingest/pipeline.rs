use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{error, info, info_span, warn, Instrument};

use super::extractor::{localize, EntityDetector};
use super::parser::{Page, PdfTextSource, TextSource};
use super::segmenter::{Segmenter, DEFAULT_SEGMENT_BYTES};
use crate::entity::SSN;
use crate::error::{Error, Result};
use crate::report::{ReportRow, ReportWriter};
use crate::source::ScanTarget;

/// Called with the report name of each document as it starts scanning.
pub type ProgressFn = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    /// Entity type kept in the report, compared exactly
    pub target_type: String,
    /// Language tag sent with every detector call
    pub language: String,
    pub segment_bytes: usize,
    /// Documents processed concurrently
    pub jobs: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            target_type: SSN.to_string(),
            language: "en".to_string(),
            segment_bytes: DEFAULT_SEGMENT_BYTES,
            jobs: 1,
        }
    }
}

/// Cooperative cancellation shared between the scanner and whoever stops it.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFailure {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPage {
    pub path: PathBuf,
    pub page: u32,
}

#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    pub documents_scanned: usize,
    pub failed_documents: Vec<DocumentFailure>,
    pub skipped_pages: Vec<SkippedPage>,
    pub detector_calls: u64,
    pub rows_written: u64,
    /// Set when a stop request left documents undispatched
    pub interrupted: bool,
}

impl ScanSummary {
    #[must_use]
    pub const fn found_matches(&self) -> bool {
        self.rows_written > 0
    }

    fn record(&mut self, path: PathBuf, outcome: DocumentOutcome) {
        let DocumentOutcome { stats, failure } = outcome;

        self.detector_calls += stats.detector_calls;
        self.rows_written += stats.rows_written;
        self.skipped_pages.extend(stats.skipped_pages.into_iter().map(|page| SkippedPage {
            path: path.clone(),
            page,
        }));

        match failure {
            Some(reason) => self.failed_documents.push(DocumentFailure { path, reason }),
            None => self.documents_scanned += 1,
        }
    }
}

#[derive(Debug, Default)]
struct DocumentStats {
    skipped_pages: Vec<u32>,
    detector_calls: u64,
    rows_written: u64,
}

/// Rows written before a failure stay in the report and are counted.
#[derive(Debug)]
struct DocumentOutcome {
    stats: DocumentStats,
    failure: Option<String>,
}

impl DocumentOutcome {
    const fn scanned(stats: DocumentStats) -> Self {
        Self {
            stats,
            failure: None,
        }
    }

    const fn failed(stats: DocumentStats, reason: String) -> Self {
        Self {
            stats,
            failure: Some(reason),
        }
    }
}

/// Drives page text through segmentation, detection and localization,
/// streaming every kept entity to the report.
#[derive(Clone)]
pub struct Scanner {
    source: Arc<dyn TextSource>,
    detector: Arc<dyn EntityDetector>,
    segmenter: Segmenter,
    options: Arc<ScanOptions>,
    progress: Option<ProgressFn>,
}

impl Scanner {
    pub fn new(detector: Arc<dyn EntityDetector>, options: ScanOptions) -> Result<Self> {
        let segmenter = Segmenter::new(options.segment_bytes)?;

        Ok(Self {
            source: Arc::new(PdfTextSource::new()),
            detector,
            segmenter,
            options: Arc::new(options),
            progress: None,
        })
    }

    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn TextSource>) -> Self {
        self.source = source;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Scans every document under `target`.
    ///
    /// Documents that cannot be read are recorded and skipped. A detector
    /// failure that survives retries aborts the scan and cancels the
    /// remaining workers.
    pub async fn scan(
        &self,
        target: &ScanTarget,
        report: Arc<ReportWriter>,
        stop: &StopSignal,
    ) -> Result<ScanSummary> {
        let documents = target.discover(self.source.extension())?;
        let jobs = self.options.jobs.max(1);

        info!(
            target = %target.root().display(),
            documents = documents.len(),
            jobs,
            detector = self.detector.name(),
            "starting scan"
        );

        let mut summary = ScanSummary::default();
        let mut pending = documents.into_iter();
        let mut workers: JoinSet<(PathBuf, Result<DocumentOutcome>)> = JoinSet::new();

        loop {
            while workers.len() < jobs && !stop.is_stopped() {
                let Some(path) = pending.next() else {
                    break;
                };
                let scanner = self.clone();
                let report = Arc::clone(&report);
                let name = target.source_name(&path);

                workers.spawn(async move {
                    let outcome = scanner.scan_document(&path, &name, &report).await;
                    (path, outcome)
                });
            }

            let Some(joined) = workers.join_next().await else {
                break;
            };

            let (path, outcome) = match joined {
                Ok(done) => done,
                Err(e) => {
                    workers.shutdown().await;
                    return Err(Error::Worker(e.to_string()));
                }
            };

            match outcome {
                Ok(outcome) => summary.record(path, outcome),
                Err(e) => {
                    workers.shutdown().await;
                    return Err(e);
                }
            }
        }

        let remaining = pending.len();
        if remaining > 0 {
            warn!(remaining, "scan stopped before all documents were dispatched");
            summary.interrupted = true;
        }

        info!(
            documents = summary.documents_scanned,
            failed = summary.failed_documents.len(),
            skipped_pages = summary.skipped_pages.len(),
            rows = summary.rows_written,
            "scan finished"
        );

        Ok(summary)
    }

    async fn scan_document(
        &self,
        path: &Path,
        name: &str,
        report: &ReportWriter,
    ) -> Result<DocumentOutcome> {
        let span = info_span!("document", file = name);

        async {
            info!(path = %path.display(), "scanning document");
            if let Some(progress) = &self.progress {
                progress(name);
            }

            let pages = match self.source.open(path).await {
                Ok(pages) => pages,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to extract document text, skipping");
                    return Ok(DocumentOutcome::failed(DocumentStats::default(), e.to_string()));
                }
            };

            let mut stats = DocumentStats::default();
            for number in 1..=pages.page_count() {
                let page = match pages.read_page(number).await {
                    Ok(page) => page,
                    Err(e) => {
                        warn!(path = %path.display(), page = number, error = %e, "failed to extract page text, skipping document");
                        return Ok(DocumentOutcome::failed(stats, e.to_string()));
                    }
                };

                if !page.has_text() {
                    info!(page = number, "no searchable text on page");
                    stats.skipped_pages.push(number);
                    continue;
                }

                self.scan_page(&page, name, report, &mut stats).await?;
            }

            Ok(DocumentOutcome::scanned(stats))
        }
        .instrument(span)
        .await
    }

    async fn scan_page(
        &self,
        page: &Page,
        name: &str,
        report: &ReportWriter,
        stats: &mut DocumentStats,
    ) -> Result<()> {
        for segment in self.segmenter.segment(&page.text) {
            stats.detector_calls += 1;

            let raw = match self.detector.detect(segment.text, &self.options.language).await {
                Ok(raw) => raw,
                Err(source) => {
                    error!(
                        page = page.number,
                        segment = segment.index,
                        detector = self.detector.name(),
                        error = %source,
                        "entity detection failed"
                    );
                    return Err(Error::Detection {
                        file: name.to_string(),
                        page: page.number,
                        segment: segment.index,
                        source,
                    });
                }
            };

            for found in localize(raw, segment.text, &self.options.target_type, name) {
                report.write_row(&ReportRow::from_match(found, page.number, segment.char_offset))?;
                stats.rows_written += 1;
            }
        }

        Ok(())
    }
}
