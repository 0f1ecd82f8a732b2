use crate::FetchRecord;
use metrics::{register_counter, register_histogram, Counter, Histogram};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Metric handles for a run. They are no-ops unless the embedding process
/// installs a `metrics` recorder.
pub struct Metrics {
    pub urls_fetched: Counter,
    pub urls_failed: Counter,
    pub write_errors: Counter,
    pub fetch_duration: Histogram,
    pub bytes_received: Counter,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            urls_fetched: register_counter!("fetch_report_urls_fetched_total"),
            urls_failed: register_counter!("fetch_report_urls_failed_total"),
            write_errors: register_counter!("fetch_report_write_errors_total"),
            fetch_duration: register_histogram!("fetch_report_fetch_duration_seconds"),
            bytes_received: register_counter!("fetch_report_bytes_received_total"),
        }
    }

    pub fn record_fetch(&self, record: &FetchRecord) {
        if record.is_success() {
            self.urls_fetched.increment(1);
        } else {
            self.urls_failed.increment(1);
        }

        if let Some(size) = record.size {
            self.bytes_received.increment(size);
        }

        self.fetch_duration.record(record.elapsed.as_secs_f64());
    }

    pub fn record_write_error(&self) {
        self.write_errors.increment(1);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// In-process counters shared by one worker and the pool that owns it.
#[derive(Debug, Default)]
pub struct WorkerCounters {
    processed: AtomicUsize,
    failed: AtomicUsize,
    write_failed: AtomicUsize,
    bytes: AtomicU64,
}

impl WorkerCounters {
    pub fn record(&self, record: &FetchRecord) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        if !record.is_success() {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        if let Some(size) = record.size {
            self.bytes.fetch_add(size, Ordering::Relaxed);
        }
    }

    pub fn record_write_failure(&self) {
        self.write_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn write_failed(&self) -> usize {
        self.write_failed.load(Ordering::Relaxed)
    }

    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}

/// Totals for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// URLs the source put on the channel
    pub enqueued: usize,
    /// URLs a worker fetched (or tried to) and reported
    pub processed: usize,
    pub failed: usize,
    pub write_failed: usize,
    /// Enqueued but never processed because the run was cancelled
    pub skipped: usize,
    pub bytes: u64,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.processed - self.failed
    }

    pub fn was_partial(&self) -> bool {
        self.skipped > 0
    }
}
