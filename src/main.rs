use anyhow::anyhow;
use chrono::Local;
use clap::Parser;
use fetch_report::{format_bytes, format_duration, setup_logging, usage, Cli, CliRunner};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    setup_logging(args.verbose).map_err(|e| anyhow!("failed to set up logging: {e}"))?;

    if args.input_path().is_none() {
        error!("missing args");
        print!("{}", usage());
        std::process::exit(1);
    }

    let runner = match CliRunner::new(&args).await {
        Ok(runner) => runner,
        Err(e) => {
            error!("{}", e);
            print!("{}", usage());
            std::process::exit(1);
        }
    };

    let cancel = CancellationToken::new();
    let _shutdown_handler = setup_shutdown_handler(cancel.clone());

    let started = Instant::now();
    println!("Start {}", Local::now());

    match runner.run(cancel).await {
        Ok(summary) => {
            println!("End {}", Local::now());
            println!("Duration {}", format_duration(started.elapsed()));
            info!(
                "{} URLs, {} failed, {} received",
                summary.processed,
                summary.failed,
                format_bytes(summary.bytes)
            );
            Ok(())
        }
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}

/// Cancel the run on SIGINT/SIGTERM. Workers finish the request they are on
/// and stop taking new URLs.
fn setup_shutdown_handler(cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    warn!("Failed to create SIGTERM handler: {}", e);
                    if tokio::signal::ctrl_c().await.is_ok() {
                        info!("Received SIGINT");
                        cancel.cancel();
                    }
                    return;
                }
            };

            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("Received SIGINT"),
                _ = sigterm.recv() => info!("Received SIGTERM"),
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for ctrl-c: {}", e);
                return;
            }
            info!("Received SIGINT");
        }

        cancel.cancel();
    })
}
