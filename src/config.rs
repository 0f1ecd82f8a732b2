//! Configuration management with serde serialization/deserialization
//!
//! This module holds the run configuration along with the record type that
//! flows from the worker pool into the report writer.

use crate::ProbeError;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure for a fetch run
///
/// # Examples
///
/// ```rust
/// use fetch_report::{Config, ReportFormat};
///
/// let config = Config {
///     pool_size: 10,
///     format: ReportFormat::Tsv,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Number of concurrent workers draining the URL channel (default: 100)
    ///
    /// Also used as the capacity of the bounded work channel.
    pub pool_size: usize,

    /// Per-request timeout enforced by the HTTP client (default: none)
    ///
    /// Without it a request may block its worker for as long as the remote
    /// end keeps the connection open.
    pub request_timeout: Option<Duration>,

    /// Custom User-Agent header (default: reqwest default)
    pub user_agent: Option<String>,

    /// Layout of the printed report (default: aligned columns)
    pub format: ReportFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pool_size: 100,
            request_timeout: None,
            user_agent: None,
            format: ReportFormat::Aligned,
        }
    }
}

impl Config {
    /// Load a configuration from a JSON file. Missing fields take their
    /// default values.
    pub async fn from_file(path: &Path) -> Result<Self, ProbeError> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            ProbeError::ConfigurationError(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| ProbeError::ConfigurationError(format!("invalid config: {e}")))
    }

    pub fn validate(&self) -> Result<(), ProbeError> {
        if self.pool_size == 0 {
            return Err(ProbeError::ConfigurationError(
                "invalid pool size: must be greater than 0".to_string(),
            ));
        }

        if let Some(timeout) = self.request_timeout {
            if timeout.is_zero() {
                return Err(ProbeError::ConfigurationError(
                    "request timeout must be greater than 0".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Report layouts
///
/// - Aligned: columns padded with spaces, rendered on flush
/// - Tsv: raw tab-separated lines, written as records arrive
/// - Json: one JSON object per record, no header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Aligned,
    Tsv,
    Json,
}

impl std::str::FromStr for ReportFormat {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aligned" => Ok(Self::Aligned),
            "tsv" => Ok(Self::Tsv),
            "json" => Ok(Self::Json),
            other => Err(ProbeError::ConfigurationError(format!(
                "unknown report format '{other}' (expected aligned, tsv or json)"
            ))),
        }
    }
}

/// Outcome of one fetch attempt. Exactly one is produced per URL consumed.
#[derive(Debug, Clone)]
pub struct FetchRecord {
    pub url: String,
    pub completed_at: DateTime<Local>,
    pub status: Option<u16>,
    pub size: Option<u64>,
    pub error: Option<ProbeError>,
    pub elapsed: Duration,
}

impl FetchRecord {
    pub fn success(url: String, status: u16, size: u64, elapsed: Duration) -> Self {
        Self {
            url,
            completed_at: Local::now(),
            status: Some(status),
            size: Some(size),
            error: None,
            elapsed,
        }
    }

    /// Size is always dropped on failure; a status code obtained before the
    /// failure is kept.
    pub fn failure(url: String, error: ProbeError, elapsed: Duration) -> Self {
        Self {
            url,
            completed_at: Local::now(),
            status: error.status_code(),
            size: None,
            error: Some(error),
            elapsed,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
