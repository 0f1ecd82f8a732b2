//! Report writer shared by all workers
//!
//! Every row goes through a mutex owned by [`ReportWriter`], so concurrent
//! workers never interleave partial lines. In the aligned layout rows are
//! buffered and the column widths are computed on [`ReportWriter::flush`];
//! the other layouts write each row as it arrives.

use crate::{FetchRecord, ProbeError, ReportFormat};
use serde::Serialize;
use std::io::Write;
use std::sync::{Mutex, MutexGuard};
use tabled::builder::Builder;
use tabled::settings::Style;

pub const HEADER: [&str; 5] = ["URL", "ProcessingTime", "CODE", "SIZE", "ERROR"];
pub const PLACEHOLDER: &str = "-";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f %z";

/// Render the five report cells for `record`.
///
/// The output depends only on the record, so two calls agree on everything;
/// the timestamp cell is the record's own completion time.
pub fn format_row(record: &FetchRecord) -> [String; 5] {
    let placeholder = || PLACEHOLDER.to_string();

    [
        single_line(&record.url),
        record.completed_at.format(TIMESTAMP_FORMAT).to_string(),
        record.status.map(|s| s.to_string()).unwrap_or_else(placeholder),
        record.size.map(|s| s.to_string()).unwrap_or_else(placeholder),
        record
            .error
            .as_ref()
            .map(|e| single_line(&e.to_string()))
            .unwrap_or_else(placeholder),
    ]
}

/// Tab-separated form of [`format_row`], without the trailing newline.
pub fn format_line(record: &FetchRecord) -> String {
    format_row(record).join("\t")
}

// Tabs and newlines inside a cell would break the column/line structure.
fn single_line(text: &str) -> String {
    text.replace(['\t', '\r', '\n'], " ")
}

#[derive(Serialize)]
struct JsonRow<'a> {
    url: &'a str,
    completed_at: String,
    status: Option<u16>,
    size: Option<u64>,
    error: Option<String>,
    elapsed_ms: u128,
}

impl<'a> From<&'a FetchRecord> for JsonRow<'a> {
    fn from(record: &'a FetchRecord) -> Self {
        Self {
            url: &record.url,
            completed_at: record.completed_at.to_rfc3339(),
            status: record.status,
            size: record.size,
            error: record.error.as_ref().map(|e| e.to_string()),
            elapsed_ms: record.elapsed.as_millis(),
        }
    }
}

struct ReportSink<W> {
    out: W,
    pending: Vec<[String; 5]>,
}

pub struct ReportWriter<W: Write + Send> {
    format: ReportFormat,
    sink: Mutex<ReportSink<W>>,
}

impl<W: Write + Send> ReportWriter<W> {
    pub fn new(out: W, format: ReportFormat) -> Self {
        Self {
            format,
            sink: Mutex::new(ReportSink {
                out,
                pending: Vec::new(),
            }),
        }
    }

    /// Emit the header row. Must be called before any record is written.
    pub fn write_header(&self) -> Result<(), ProbeError> {
        let mut sink = self.lock()?;
        match self.format {
            ReportFormat::Aligned => {
                sink.pending.push(HEADER.map(String::from));
                Ok(())
            }
            ReportFormat::Tsv => {
                writeln!(sink.out, "{}", HEADER.join("\t")).map_err(write_error)
            }
            ReportFormat::Json => Ok(()),
        }
    }

    /// Append one record. The whole row is written inside one critical
    /// section.
    pub fn write_record(&self, record: &FetchRecord) -> Result<(), ProbeError> {
        match self.format {
            ReportFormat::Aligned => {
                let row = format_row(record);
                self.lock()?.pending.push(row);
                Ok(())
            }
            ReportFormat::Tsv => {
                let line = format_line(record);
                let mut sink = self.lock()?;
                writeln!(sink.out, "{line}").map_err(write_error)
            }
            ReportFormat::Json => {
                let line = serde_json::to_string(&JsonRow::from(record))?;
                let mut sink = self.lock()?;
                writeln!(sink.out, "{line}").map_err(write_error)
            }
        }
    }

    /// Render any buffered rows and flush the underlying sink.
    pub fn flush(&self) -> Result<(), ProbeError> {
        let mut sink = self.lock()?;

        if !sink.pending.is_empty() {
            let mut builder = Builder::default();
            for row in sink.pending.drain(..) {
                builder.push_record(row);
            }
            let mut table = builder.build();
            table.with(Style::blank());
            writeln!(sink.out, "{table}").map_err(write_error)?;
        }

        sink.out.flush().map_err(write_error)
    }

    /// Recover the sink. Buffered aligned rows that were never flushed are
    /// discarded.
    pub fn into_inner(self) -> Result<W, ProbeError> {
        self.sink
            .into_inner()
            .map(|sink| sink.out)
            .map_err(|_| ProbeError::WriteError("report sink lock poisoned".to_string()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, ReportSink<W>>, ProbeError> {
        self.sink
            .lock()
            .map_err(|_| ProbeError::WriteError("report sink lock poisoned".to_string()))
    }
}

fn write_error(err: std::io::Error) -> ProbeError {
    ProbeError::WriteError(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use std::sync::Arc;
    use std::time::Duration;

    fn ok_record(url: &str) -> FetchRecord {
        FetchRecord::success(url.to_string(), 200, 50, Duration::from_millis(12))
    }

    fn failed_record(url: &str) -> FetchRecord {
        FetchRecord::failure(
            url.to_string(),
            ProbeError::InvalidUrl(format!("{url}: relative URL without a base")),
            Duration::ZERO,
        )
    }

    struct ClosedSink;

    impl Write for ClosedSink {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "sink closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "sink closed"))
        }
    }

    #[test]
    fn test_success_row_placeholders() {
        let row = format_row(&ok_record("https://ok.example"));
        assert_eq!(row[0], "https://ok.example");
        assert_eq!(row[2], "200");
        assert_eq!(row[3], "50");
        assert_eq!(row[4], PLACEHOLDER);
    }

    #[test]
    fn test_failure_row_placeholders() {
        let row = format_row(&failed_record("not a url"));
        assert_eq!(row[2], PLACEHOLDER);
        assert_eq!(row[3], PLACEHOLDER);
        assert!(row[4].starts_with("Invalid URL"));
    }

    #[test]
    fn test_body_failure_row_keeps_code() {
        let record = FetchRecord::failure(
            "https://slow.example".to_string(),
            ProbeError::BodyReadFailed {
                status: 200,
                reason: "reset".to_string(),
            },
            Duration::ZERO,
        );
        let row = format_row(&record);
        assert_eq!(row[2], "200");
        assert_eq!(row[3], PLACEHOLDER);
    }

    #[test]
    fn test_formatting_is_deterministic_apart_from_timestamp() {
        let mut first = ok_record("https://ok.example");
        let mut second = first.clone();
        first.completed_at = Local::now();
        second.completed_at = first.completed_at + chrono::Duration::seconds(3);

        let a = format_row(&first);
        let b = format_row(&second);
        assert_ne!(a[1], b[1]);
        assert_eq!(
            [&a[0], &a[2], &a[3], &a[4]],
            [&b[0], &b[2], &b[3], &b[4]]
        );
        assert_eq!(format_row(&first), format_row(&first));
    }

    #[test]
    fn test_error_text_cannot_split_a_line() {
        let record = FetchRecord::failure(
            "https://x.example".to_string(),
            ProbeError::NetworkError("line one\nline\ttwo".to_string()),
            Duration::ZERO,
        );
        let line = format_line(&record);
        assert!(!line.contains('\n'));
        assert_eq!(line.split('\t').count(), 5);
    }

    #[test]
    fn test_tsv_header_then_rows() {
        let writer = ReportWriter::new(Vec::new(), ReportFormat::Tsv);
        writer.write_header().unwrap();
        writer.write_record(&ok_record("https://a.example")).unwrap();
        writer.write_record(&failed_record("")).unwrap();
        writer.flush().unwrap();

        let out = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "URL\tProcessingTime\tCODE\tSIZE\tERROR");
        assert!(lines[1].starts_with("https://a.example\t"));
        assert!(lines[2].starts_with('\t'));
    }

    #[test]
    fn test_aligned_output_renders_on_flush() {
        let writer = ReportWriter::new(Vec::new(), ReportFormat::Aligned);
        writer.write_header().unwrap();
        writer.write_record(&ok_record("https://a.example")).unwrap();
        writer.write_record(&ok_record("https://longer-host.example/path")).unwrap();
        writer.flush().unwrap();

        let out = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = out.lines().filter(|l| !l.trim().is_empty()).collect();
        assert_eq!(lines.len(), 3);
        let header: Vec<&str> = lines[0].split_whitespace().collect();
        assert_eq!(header, HEADER);
        // CODE column starts at the same offset on every row
        let code_at = lines[0].find("CODE").unwrap();
        assert_eq!(&lines[1][code_at..code_at + 3], "200");
        assert_eq!(&lines[2][code_at..code_at + 3], "200");
    }

    #[test]
    fn test_json_lines() {
        let writer = ReportWriter::new(Vec::new(), ReportFormat::Json);
        writer.write_header().unwrap();
        writer.write_record(&ok_record("https://a.example")).unwrap();
        writer.write_record(&failed_record("bad")).unwrap();

        let out = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let rows: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["status"], 200);
        assert_eq!(rows[0]["size"], 50);
        assert!(rows[0]["error"].is_null());
        assert!(rows[1]["status"].is_null());
        assert!(rows[1]["error"].as_str().unwrap().contains("bad"));
    }

    #[test]
    fn test_write_failure_is_reported() {
        let writer = ReportWriter::new(ClosedSink, ReportFormat::Tsv);
        let err = writer.write_record(&ok_record("https://a.example")).unwrap_err();
        assert!(matches!(err, ProbeError::WriteError(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_concurrent_writers_do_not_interleave() {
        let writer = Arc::new(ReportWriter::new(Vec::new(), ReportFormat::Tsv));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let writer = writer.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let url = format!("https://host{t}.example/{i}/{}", "x".repeat(200));
                        writer.write_record(&failed_record(&url)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let writer = Arc::try_unwrap(writer).ok().unwrap();
        let out = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 400);
        assert!(lines.iter().all(|l| l.split('\t').count() == 5));
    }
}
