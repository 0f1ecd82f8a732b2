use crate::{
    fetch_record, ErrorSeverity, FetchClient, Metrics, ProbeError, ReportWriter, WorkerCounters,
};
use std::io::Write;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub struct FetchWorker<W: Write + Send> {
    id: usize,
    client: Arc<dyn FetchClient>,
    report: Arc<ReportWriter<W>>,
    metrics: Arc<Metrics>,
    counters: Arc<WorkerCounters>,
}

impl<W: Write + Send> Clone for FetchWorker<W> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            client: self.client.clone(),
            report: self.report.clone(),
            metrics: self.metrics.clone(),
            counters: self.counters.clone(),
        }
    }
}

impl<W: Write + Send> FetchWorker<W> {
    pub fn new(
        id: usize,
        client: Arc<dyn FetchClient>,
        report: Arc<ReportWriter<W>>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            id,
            client,
            report,
            metrics,
            counters: Arc::new(WorkerCounters::default()),
        }
    }

    /// Drain `urls` until it is closed and empty, or until `cancel` fires.
    ///
    /// Cancellation is checked after a URL is received and before it is
    /// fetched; a request already in flight runs to completion.
    pub async fn run_with_shared_receiver(
        &self,
        cancel: CancellationToken,
        urls: Arc<Mutex<mpsc::Receiver<String>>>,
    ) {
        debug!("Starting fetch worker {}", self.id);

        loop {
            let url = {
                let mut receiver = urls.lock().await;
                receiver.recv().await
            };

            let Some(url) = url else {
                break;
            };

            if cancel.is_cancelled() {
                debug!("Worker {} cancelled, dropping {}", self.id, url);
                break;
            }

            self.process_url(url).await;
        }

        debug!("Fetch worker {} stopped", self.id);
    }

    async fn process_url(&self, url: String) {
        debug!("Worker {} fetching {}", self.id, url);

        let record = fetch_record(self.client.as_ref(), url).await;
        self.counters.record(&record);
        self.metrics.record_fetch(&record);

        if let Some(e) = &record.error {
            match e.severity() {
                ErrorSeverity::Low => debug!("Worker {} rejected {:?}: {}", self.id, record.url, e),
                _ => warn!("Worker {} failed to fetch {}: {}", self.id, record.url, e),
            }
        }

        if let Err(e) = self.report.write_record(&record) {
            self.counters.record_write_failure();
            self.metrics.record_write_error();
            error!("Worker {} failed to write line for {}: {}", self.id, record.url, e);
        }
    }

    pub fn get_stats(&self) -> WorkerStats {
        WorkerStats {
            id: self.id,
            processed_count: self.counters.processed(),
            error_count: self.counters.failed(),
            write_error_count: self.counters.write_failed(),
            bytes: self.counters.bytes(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkerStats {
    pub id: usize,
    pub processed_count: usize,
    pub error_count: usize,
    pub write_error_count: usize,
    pub bytes: u64,
}

#[derive(Debug, Clone, Default)]
pub struct WorkerPoolStats {
    pub worker_stats: Vec<WorkerStats>,
    pub total_processed: usize,
    pub total_errors: usize,
    pub total_write_errors: usize,
    pub total_bytes: u64,
}

pub struct WorkerPool<W: Write + Send> {
    workers: Vec<FetchWorker<W>>,
}

impl<W: Write + Send + 'static> WorkerPool<W> {
    pub fn new(
        size: usize,
        client: Arc<dyn FetchClient>,
        report: Arc<ReportWriter<W>>,
        metrics: Arc<Metrics>,
    ) -> Result<Self, ProbeError> {
        if size == 0 {
            return Err(ProbeError::ConfigurationError(
                "invalid pool size: must be greater than 0".to_string(),
            ));
        }

        let workers = (0..size)
            .map(|i| FetchWorker::new(i, client.clone(), report.clone(), metrics.clone()))
            .collect();

        Ok(Self { workers })
    }

    /// Spawn one task per worker over a shared receiver and wait for all of
    /// them to finish.
    pub async fn run(
        &self,
        cancel: CancellationToken,
        urls: mpsc::Receiver<String>,
    ) -> WorkerPoolStats {
        info!("Starting worker pool with {} workers", self.workers.len());

        let shared_receiver = Arc::new(Mutex::new(urls));

        let handles: Vec<_> = self
            .workers
            .iter()
            .map(|worker| {
                let worker = worker.clone();
                let rx = shared_receiver.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    worker.run_with_shared_receiver(cancel, rx).await;
                })
            })
            .collect();

        // Once every worker holds its own clone, the receiver closes as soon as
        // the last worker exits.
        drop(shared_receiver);

        for (id, joined) in futures::future::join_all(handles).await.into_iter().enumerate() {
            if let Err(e) = joined {
                error!("Worker {} task failed: {}", id, e);
            }
        }

        self.get_stats()
    }

    pub fn get_stats(&self) -> WorkerPoolStats {
        let worker_stats: Vec<WorkerStats> = self.workers.iter().map(|w| w.get_stats()).collect();

        WorkerPoolStats {
            total_processed: worker_stats.iter().map(|s| s.processed_count).sum(),
            total_errors: worker_stats.iter().map(|s| s.error_count).sum(),
            total_write_errors: worker_stats.iter().map(|s| s.write_error_count).sum(),
            total_bytes: worker_stats.iter().map(|s| s.bytes).sum(),
            worker_stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ReportFormat, StubFetchClient};
    use std::time::Duration;

    fn pool_with(
        size: usize,
        client: StubFetchClient,
    ) -> (WorkerPool<Vec<u8>>, Arc<ReportWriter<Vec<u8>>>) {
        let report = Arc::new(ReportWriter::new(Vec::new(), ReportFormat::Tsv));
        let pool = WorkerPool::new(
            size,
            Arc::new(client),
            report.clone(),
            Arc::new(Metrics::new()),
        )
        .unwrap();
        (pool, report)
    }

    fn output(pool: WorkerPool<Vec<u8>>, report: Arc<ReportWriter<Vec<u8>>>) -> String {
        drop(pool);
        let report = Arc::try_unwrap(report).ok().unwrap();
        String::from_utf8(report.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_zero_pool_size_rejected() {
        let report = Arc::new(ReportWriter::new(Vec::new(), ReportFormat::Tsv));
        let result = WorkerPool::new(
            0,
            Arc::new(StubFetchClient::new()),
            report,
            Arc::new(Metrics::new()),
        );
        assert!(matches!(result, Err(ProbeError::ConfigurationError(_))));
    }

    #[tokio::test]
    async fn test_one_record_per_url() {
        let (pool, report) = pool_with(3, StubFetchClient::new().respond("https://a.example", 200, 7));
        let (tx, rx) = mpsc::channel(3);

        let producer = tokio::spawn(async move {
            for i in 0..20 {
                let url = if i % 2 == 0 {
                    "https://a.example".to_string()
                } else {
                    format!("https://down{i}.example")
                };
                tx.send(url).await.unwrap();
            }
        });

        let stats = pool.run(CancellationToken::new(), rx).await;
        producer.await.unwrap();

        assert_eq!(stats.total_processed, 20);
        assert_eq!(stats.total_errors, 10);
        assert_eq!(stats.total_bytes, 70);
        assert_eq!(stats.worker_stats.len(), 3);

        let out = output(pool, report);
        assert_eq!(out.lines().count(), 20);
    }

    #[tokio::test]
    async fn test_cancelled_pool_consumes_nothing_new() {
        let (pool, report) = pool_with(2, StubFetchClient::new());
        let (tx, rx) = mpsc::channel(4);
        for i in 0..4 {
            tx.send(format!("https://h{i}.example")).await.unwrap();
        }
        drop(tx);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let stats = pool.run(cancel, rx).await;

        assert_eq!(stats.total_processed, 0);
        assert_eq!(output(pool, report), "");
    }

    #[tokio::test]
    async fn test_in_flight_fetch_completes_after_cancel() {
        let client = StubFetchClient::new()
            .respond("https://slow.example", 200, 1)
            .with_latency(Duration::from_millis(100));
        let (pool, report) = pool_with(1, client);
        let (tx, rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        let sender = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tx.send("https://slow.example".to_string()).await.unwrap();
                tokio::time::sleep(Duration::from_millis(20)).await;
                cancel.cancel();
                let _ = tx.send("https://slow.example".to_string()).await;
            })
        };

        let stats = pool.run(cancel, rx).await;
        sender.await.unwrap();

        assert_eq!(stats.total_processed, 1);
        assert_eq!(output(pool, report).lines().count(), 1);
    }
}
