use crate::{produce, Config, FetchClient, Metrics, ProbeError, ReportWriter, RunSummary, WorkerPool};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Fetch every URL listed in `path` and write one report row per URL.
///
/// Configuration is validated before the file is opened or any task is
/// spawned. A failure of the URL source aborts the run without flushing the
/// report. Per-URL failures only show up in the report and the log.
pub async fn run<W: Write + Send + 'static>(
    cancel: CancellationToken,
    config: &Config,
    path: &Path,
    client: Arc<dyn FetchClient>,
    report: Arc<ReportWriter<W>>,
) -> Result<RunSummary, ProbeError> {
    config.validate()?;
    if path.as_os_str().is_empty() {
        return Err(ProbeError::ConfigurationError("invalid path".to_string()));
    }

    let started = Instant::now();
    let pool = WorkerPool::new(config.pool_size, client, report.clone(), Arc::new(Metrics::new()))?;

    report.write_header()?;

    // A source failure cancels this run only, never the caller's token.
    let run_cancel = cancel.child_token();
    let (url_tx, url_rx) = mpsc::channel(config.pool_size);

    info!("Reading URLs from {}", path.display());
    let source = {
        let cancel = run_cancel.clone();
        let path = path.to_path_buf();
        tokio::spawn(async move {
            let result = produce(cancel.clone(), url_tx, &path).await;
            if result.is_err() {
                cancel.cancel();
            }
            result
        })
    };

    let stats = pool.run(run_cancel, url_rx).await;

    let enqueued = match source.await {
        Ok(Ok(enqueued)) => enqueued,
        Ok(Err(e)) => {
            error!("URL source failed: {}", e);
            return Err(e);
        }
        Err(e) => return Err(ProbeError::IoError(format!("URL source task failed: {e}"))),
    };

    report.flush()?;

    let summary = RunSummary {
        enqueued,
        processed: stats.total_processed,
        failed: stats.total_errors,
        write_failed: stats.total_write_errors,
        skipped: enqueued.saturating_sub(stats.total_processed),
        bytes: stats.total_bytes,
        elapsed: started.elapsed(),
    };

    if summary.was_partial() {
        warn!(
            "Run cancelled: {} of {} enqueued URLs were not processed",
            summary.skipped, summary.enqueued
        );
    }

    info!(
        "Processed {} URLs ({} ok, {} failed) in {:?}",
        summary.processed,
        summary.succeeded(),
        summary.failed,
        summary.elapsed
    );

    Ok(summary)
}
