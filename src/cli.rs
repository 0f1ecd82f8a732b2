use crate::{
    run, Config, HttpFetchClient, ProbeError, ReportFormat, ReportWriter, RunSummary,
};
use clap::Parser;
use std::io::{BufWriter, Stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "fetch-report")]
#[command(about = "Fetch a list of URLs concurrently and print a status report")]
#[command(version)]
pub struct Cli {
    #[arg(short = 'f', value_name = "PATH", help = "File path.")]
    pub file: Option<String>,

    #[arg(short, long, help = "Number of concurrent workers")]
    pub workers: Option<usize>,

    #[arg(long, help = "Per-request timeout in seconds")]
    pub timeout: Option<u64>,

    #[arg(long, help = "Report layout (aligned, tsv, json)")]
    pub format: Option<String>,

    #[arg(long, help = "Configuration file path (JSON)")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Enable verbose logging")]
    pub verbose: bool,
}

impl Cli {
    /// The input path, unless it is missing or empty.
    pub fn input_path(&self) -> Option<PathBuf> {
        self.file
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
    }
}

pub fn usage() -> String {
    format!(
        "Usage of {name}:\n  {name} -f path/to/file [--workers N] [--timeout SECS] [--format aligned|tsv|json]\n",
        name = env!("CARGO_PKG_NAME")
    )
}

pub struct CliRunner {
    pub config: Config,
    pub path: PathBuf,
}

impl CliRunner {
    pub async fn new(args: &Cli) -> Result<Self, ProbeError> {
        let path = args
            .input_path()
            .ok_or_else(|| ProbeError::ConfigurationError("missing args".to_string()))?;

        let mut config = match &args.config {
            Some(config_path) => Config::from_file(config_path).await?,
            None => Config::default(),
        };

        // Override with CLI arguments
        if let Some(workers) = args.workers {
            config.pool_size = workers;
        }
        if let Some(timeout) = args.timeout {
            config.request_timeout = Some(Duration::from_secs(timeout));
        }
        if let Some(format) = &args.format {
            config.format = format.parse::<ReportFormat>()?;
        }

        config.validate()?;

        info!("Worker pool size: {}", config.pool_size);
        info!("Request timeout: {:?}", config.request_timeout);
        info!("Report format: {:?}", config.format);

        Ok(Self { config, path })
    }

    pub async fn run(&self, cancel: CancellationToken) -> Result<RunSummary, ProbeError> {
        let client = Arc::new(HttpFetchClient::new(&self.config)?);
        let report: Arc<ReportWriter<BufWriter<Stdout>>> = Arc::new(ReportWriter::new(
            BufWriter::new(std::io::stdout()),
            self.config.format,
        ));

        run(cancel, &self.config, &self.path, client, report).await
    }
}

/// Logs go to stderr so stdout carries only the report.
pub fn setup_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()?;

    Ok(())
}
