use crate::ProbeError;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Stream trimmed lines of `path` into `urls`, one URL per line.
///
/// Blank lines are forwarded as empty strings. Cancellation is checked before
/// each line. The channel is closed when this function returns, on every
/// path, because it owns the only sender. Returns the number of URLs enqueued.
pub async fn produce(
    cancel: CancellationToken,
    urls: mpsc::Sender<String>,
    path: &Path,
) -> Result<usize, ProbeError> {
    let file = File::open(path)
        .await
        .map_err(|e| ProbeError::IoError(format!("cannot open {}: {e}", path.display())))?;

    // Raw segments rather than `lines()`: a line that is not UTF-8 must fail
    // on its own row instead of aborting the whole file.
    let mut lines = BufReader::new(file).split(b'\n');
    let mut enqueued = 0;

    loop {
        if cancel.is_cancelled() {
            info!("URL source cancelled after {} URLs", enqueued);
            break;
        }

        let line = lines
            .next_segment()
            .await
            .map_err(|e| ProbeError::IoError(format!("cannot read {}: {e}", path.display())))?;

        let Some(line) = line else {
            break;
        };

        let url = String::from_utf8_lossy(&line).trim().to_string();
        if urls.send(url).await.is_err() {
            // every worker has exited
            debug!("URL channel has no receivers, stopping source");
            break;
        }
        enqueued += 1;
    }

    debug!("URL source finished: {} URLs enqueued", enqueued);
    Ok(enqueued)
}
