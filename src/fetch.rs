//! HTTP fetch capability
//!
//! The worker pool only ever talks to the network through [`FetchClient`].
//! [`HttpFetchClient`] is the production implementation backed by reqwest;
//! [`StubFetchClient`] replays canned responses for tests and benchmarks.

use crate::{validate_url, Config, FetchRecord, ProbeError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

/// Status and fully-read body length of a completed GET.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body_len: u64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FetchClient: Send + Sync {
    /// Issue a GET and read the whole body.
    ///
    /// A failure after the status line was received must be reported as
    /// [`ProbeError::BodyReadFailed`] so the status survives into the report.
    async fn get(&self, url: &Url) -> Result<FetchResponse, ProbeError>;
}

/// Validate `raw`, fetch it and turn the outcome into a record.
///
/// Malformed URLs never reach the client.
pub async fn fetch_record(client: &dyn FetchClient, raw: String) -> FetchRecord {
    let start = Instant::now();

    let url = match validate_url(&raw) {
        Ok(url) => url,
        Err(e) => return FetchRecord::failure(raw, e, start.elapsed()),
    };

    match client.get(&url).await {
        Ok(response) => {
            FetchRecord::success(raw, response.status, response.body_len, start.elapsed())
        }
        Err(e) => FetchRecord::failure(raw, e, start.elapsed()),
    }
}

pub struct HttpFetchClient {
    client: reqwest::Client,
    timeout: Option<Duration>,
}

impl HttpFetchClient {
    pub fn new(config: &Config) -> Result<Self, ProbeError> {
        let mut builder = reqwest::Client::builder();

        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        let client = builder
            .build()
            .map_err(|e| ProbeError::ConfigurationError(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout: config.request_timeout,
        })
    }

    fn classify(&self, err: reqwest::Error) -> ProbeError {
        match self.timeout {
            Some(timeout) if err.is_timeout() => ProbeError::Timeout(timeout),
            _ => ProbeError::NetworkError(err.to_string()),
        }
    }
}

#[async_trait]
impl FetchClient for HttpFetchClient {
    async fn get(&self, url: &Url) -> Result<FetchResponse, ProbeError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status().as_u16();
        debug!("GET {} -> {}", url, status);

        // Content-Length is not trusted; the body is read to the end. Any
        // failure from here on, timeouts included, keeps the status.
        let body = response
            .bytes()
            .await
            .map_err(|e| ProbeError::BodyReadFailed {
                status,
                reason: match self.timeout {
                    Some(timeout) if e.is_timeout() => format!("timed out after {timeout:?}"),
                    _ => e.to_string(),
                },
            })?;

        Ok(FetchResponse {
            status,
            body_len: body.len() as u64,
        })
    }
}

/// Scripted client. Unknown URLs fail with a network error.
#[derive(Debug, Clone, Default)]
pub struct StubFetchClient {
    responses: HashMap<String, Result<FetchResponse, ProbeError>>,
    latency: Option<Duration>,
}

impl StubFetchClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, url: &str, status: u16, body_len: u64) -> Self {
        self.responses
            .insert(url.to_string(), Ok(FetchResponse { status, body_len }));
        self
    }

    pub fn fail(mut self, url: &str, error: ProbeError) -> Self {
        self.responses.insert(url.to_string(), Err(error));
        self
    }

    /// Delay every request by `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

#[async_trait]
impl FetchClient for StubFetchClient {
    async fn get(&self, url: &Url) -> Result<FetchResponse, ProbeError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        // Url normalises a bare host to "https://host/", so try both forms.
        let key = url.as_str();
        let lookup = self
            .responses
            .get(key)
            .or_else(|| self.responses.get(key.trim_end_matches('/')));

        match lookup {
            Some(outcome) => outcome.clone(),
            None => Err(ProbeError::NetworkError(format!(
                "no route to {}",
                url.host_str().unwrap_or("host")
            ))),
        }
    }
}
