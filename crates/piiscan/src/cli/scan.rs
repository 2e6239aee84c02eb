use std::future::Future;
use std::sync::Arc;

use anyhow::{bail, Result};
use console::style;
use piiscan_core::ingest::{EntityDetector, PatternDetector, ScanSummary, Scanner, StopSignal};
use piiscan_core::network::{guarded, ComprehendDetector, DetectorConfig};
use piiscan_core::{Error, ReportWriter, ScanTarget};
use tokio::sync::oneshot;
use tracing::{info, warn};

use super::{Cli, DetectorKind};

pub async fn run(cli: &Cli) -> Result<()> {
    let config = cli.scan_config().map_err(Error::from)?;
    let target = ScanTarget::resolve(&cli.target, cli.mode()).map_err(Error::from)?;
    let detector = build_detector(cli.detector, &config.detector).await?;
    let scanner = Scanner::new(detector, config.scan)?
        .with_progress(Arc::new(|name: &str| println!("{name}")));

    // Appends this run's header, so every startup check must come first.
    let report = Arc::new(ReportWriter::open_in(&cli.report_dir).map_err(Error::from)?);

    let stop = StopSignal::new();
    let (force_tx, force_rx) = oneshot::channel();
    let interrupts = tokio::spawn(watch_interrupts(stop.clone(), force_tx));
    let result = until_forced(scanner.scan(&target, Arc::clone(&report), &stop), force_rx).await;
    interrupts.abort();

    print_summary(&result?, &report);
    Ok(())
}

/// Runs `scan` unless `forced` fires first, in which case the scan future
/// (and its workers) is dropped at its next await point.
async fn until_forced<T>(
    scan: impl Future<Output = piiscan_core::Result<T>>,
    forced: oneshot::Receiver<()>,
) -> Result<T> {
    tokio::select! {
        result = scan => Ok(result?),
        Ok(()) = forced => bail!("scan abandoned by a second interrupt"),
    }
}

async fn build_detector(
    kind: DetectorKind,
    config: &DetectorConfig,
) -> Result<Arc<dyn EntityDetector>> {
    let detector: Arc<dyn EntityDetector> = match kind {
        DetectorKind::Pattern => Arc::new(PatternDetector::default()),
        DetectorKind::Comprehend => {
            let client = ComprehendDetector::new(config).await.map_err(Error::from)?;
            info!(region = %config.region, "using comprehend detector");
            Arc::new(guarded(Box::new(client), config))
        }
    };
    Ok(detector)
}

/// First Ctrl-C stops dispatching documents; a second one abandons the scan.
async fn watch_interrupts(stop: StopSignal, force: oneshot::Sender<()>) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    warn!("interrupt received, finishing in-flight documents");
    eprintln!(
        "{} stopping after documents in progress finish (Ctrl-C again to abort)",
        style("!").yellow()
    );
    stop.stop();

    if tokio::signal::ctrl_c().await.is_ok() {
        warn!("second interrupt received, abandoning in-flight documents");
        let _ = force.send(());
    }
}

fn print_summary(summary: &ScanSummary, report: &ReportWriter) {
    if summary.found_matches() {
        println!(
            "{} match(es) written to {}",
            style(summary.rows_written).green().bold(),
            report.path().display()
        );
    } else {
        println!("No matches found.");
    }

    if !summary.failed_documents.is_empty() {
        eprintln!(
            "  {} {} document(s) could not be read",
            style("✗").red(),
            summary.failed_documents.len()
        );
        for failure in &summary.failed_documents {
            eprintln!("    {}: {}", failure.path.display(), style(&failure.reason).dim());
        }
    }

    if !summary.skipped_pages.is_empty() {
        eprintln!(
            "  {} {} page(s) without searchable text",
            style("→").dim(),
            summary.skipped_pages.len()
        );
    }

    if summary.interrupted {
        eprintln!("  {} scan interrupted before all documents were read", style("!").yellow());
    }
}

#[cfg(test)]
mod tests {
    use std::future;

    use super::*;

    #[tokio::test]
    async fn test_forced_stop_abandons_pending_scan() {
        let (force_tx, force_rx) = oneshot::channel();
        force_tx.send(()).unwrap();

        let result = until_forced(future::pending::<piiscan_core::Result<ScanSummary>>(), force_rx).await;

        assert!(result.unwrap_err().to_string().contains("second interrupt"));
    }

    #[tokio::test]
    async fn test_finished_scan_wins_without_force() {
        let (_force_tx, force_rx) = oneshot::channel::<()>();
        let summary = ScanSummary {
            rows_written: 3,
            ..Default::default()
        };

        let result = until_forced(future::ready(Ok(summary)), force_rx).await.unwrap();

        assert_eq!(result.rows_written, 3);
    }

    #[tokio::test]
    async fn test_scan_error_passes_through() {
        let (_force_tx, force_rx) = oneshot::channel::<()>();
        let failure = Error::Worker("worker panicked".into());

        let result = until_forced(future::ready(Err::<ScanSummary, _>(failure)), force_rx).await;

        assert!(result.unwrap_err().downcast_ref::<Error>().is_some());
    }
}
