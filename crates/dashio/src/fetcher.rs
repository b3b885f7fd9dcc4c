// Per-target fetching: one HTTP GET per attempt, exponential backoff
// between attempts, and an atomic whole-file write on success.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use mpd::FetchTarget;
use reqwest::Client;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::DownloaderConfig;
use crate::error::DownloadError;
use crate::report::DownloadResult;

/// Seam between the scheduler and the network, so runs can be driven with a
/// mock fetcher in tests.
#[async_trait]
pub trait TargetFetcher: Send + Sync {
    /// Drive `target` to a terminal status, retries included.
    async fn fetch(&self, target: &FetchTarget, cancel: CancellationToken) -> DownloadResult;
}

/// Fetches targets over a shared reqwest client and materializes them under
/// the output root.
pub struct HttpFetcher {
    client: Client,
    config: Arc<DownloaderConfig>,
    output_root: PathBuf,
}

impl HttpFetcher {
    pub fn new(client: Client, config: Arc<DownloaderConfig>, output_root: PathBuf) -> Self {
        Self {
            client,
            config,
            output_root,
        }
    }

    /// One whole-file attempt: request, status check, body, atomic write.
    async fn attempt(&self, target: &FetchTarget) -> Result<u64, DownloadError> {
        let response = self
            .client
            .get(target.url.clone())
            .timeout(self.config.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status(status));
        }

        let body = response.bytes().await?;
        let dest = self.output_root.join(&target.rel_path);
        write_atomic(&dest, &body).await?;
        Ok(body.len() as u64)
    }
}

#[async_trait]
impl TargetFetcher for HttpFetcher {
    async fn fetch(&self, target: &FetchTarget, cancel: CancellationToken) -> DownloadResult {
        let (attempts, outcome) = fetch_with_retries(
            || self.attempt(target),
            self.config.max_retries,
            self.config.retry_delay_base,
            &cancel,
        )
        .await;

        match outcome {
            Ok(bytes) => {
                debug!(url = %target.url, bytes, attempts, "downloaded target");
                DownloadResult::success(target.clone(), attempts, bytes)
            }
            Err(error) => {
                warn!(url = %target.url, attempts, %error, "target failed");
                DownloadResult::failed(target.clone(), attempts, error)
            }
        }
    }
}

/// Run `attempt` up to `max_retries + 1` times with exponential backoff
/// (`delay_base * 2^(attempt - 1)`) between failures. Returns the attempt
/// count alongside the final outcome. Cancellation interrupts both the
/// in-flight attempt and the backoff sleep; non-retryable errors stop the
/// loop immediately.
pub async fn fetch_with_retries<F, Fut>(
    mut attempt: F,
    max_retries: u32,
    delay_base: Duration,
    cancel: &CancellationToken,
) -> (u32, Result<u64, DownloadError>)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<u64, DownloadError>>,
{
    let mut attempts: u32 = 0;
    loop {
        if cancel.is_cancelled() {
            return (attempts, Err(DownloadError::Cancelled));
        }
        attempts += 1;

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return (attempts, Err(DownloadError::Cancelled)),
            outcome = attempt() => outcome,
        };

        match outcome {
            Ok(bytes) => return (attempts, Ok(bytes)),
            Err(error) => {
                if !error.is_retryable() || attempts > max_retries {
                    return (attempts, Err(error));
                }
                let delay = delay_base * 2u32.saturating_pow(attempts - 1);
                debug!(attempt = attempts, ?delay, %error, "fetch attempt failed, backing off");
                tokio::select! {
                    _ = cancel.cancelled() => return (attempts, Err(DownloadError::Cancelled)),
                    _ = sleep(delay) => {}
                }
            }
        }
    }
}

/// Write the body next to the destination and rename into place, so a
/// partially written file never sits at the final path. An existing file is
/// overwritten: attempts are whole-file, never resumed. Filesystem failures
/// get exactly one retry of the write.
async fn write_atomic(dest: &Path, body: &Bytes) -> Result<(), DownloadError> {
    if let Err(first) = try_write(dest, body).await {
        warn!(dest = %dest.display(), error = %first, "write failed, retrying once");
        try_write(dest, body).await?;
    }
    Ok(())
}

async fn try_write(dest: &Path, body: &Bytes) -> std::io::Result<()> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut part = dest.as_os_str().to_owned();
    part.push(".part");
    let part = PathBuf::from(part);
    tokio::fs::write(&part, body).await?;
    tokio::fs::rename(&part, dest).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting_attempt(
        calls: Arc<AtomicU32>,
        fail_first: u32,
    ) -> impl FnMut() -> std::pin::Pin<Box<dyn Future<Output = Result<u64, DownloadError>> + Send>>
    {
        move || {
            let calls = calls.clone();
            Box::pin(async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < fail_first {
                    Err(DownloadError::Status(StatusCode::BAD_GATEWAY))
                } else {
                    Ok(42)
                }
            })
        }
    }

    #[tokio::test]
    async fn succeeds_after_k_failures_with_k_plus_one_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let cancel = CancellationToken::new();

        let (attempts, outcome) = fetch_with_retries(
            counting_attempt(calls.clone(), 2),
            3,
            Duration::from_millis(1),
            &cancel,
        )
        .await;

        assert_eq!(attempts, 3);
        assert_eq!(outcome.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_retries_with_max_plus_one_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let cancel = CancellationToken::new();

        let (attempts, outcome) = fetch_with_retries(
            counting_attempt(calls.clone(), u32::MAX),
            3,
            Duration::from_millis(1),
            &cancel,
        )
        .await;

        assert_eq!(attempts, 4);
        assert!(matches!(outcome, Err(DownloadError::Status(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn non_retryable_error_stops_immediately() {
        let cancel = CancellationToken::new();
        let (attempts, outcome) = fetch_with_retries(
            || async {
                Err(DownloadError::Filesystem(std::io::Error::other(
                    "disk full",
                )))
            },
            3,
            Duration::from_millis(1),
            &cancel,
        )
        .await;

        assert_eq!(attempts, 1);
        assert!(matches!(outcome, Err(DownloadError::Filesystem(_))));
    }

    #[tokio::test]
    async fn cancelled_token_prevents_any_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let (attempts, outcome) = fetch_with_retries(
            counting_attempt(calls.clone(), 0),
            3,
            Duration::from_millis(1),
            &cancel,
        )
        .await;

        assert_eq!(attempts, 0);
        assert!(matches!(outcome, Err(DownloadError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn write_atomic_creates_parents_and_overwrites() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dest = dir.path().join("cdn.example/video/seg-1.m4s");

        write_atomic(&dest, &Bytes::from_static(b"first")).await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"first");

        write_atomic(&dest, &Bytes::from_static(b"second")).await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"second");

        // No stray .part file is left behind.
        let part = dest.with_file_name("seg-1.m4s.part");
        assert!(!part.exists());
    }
}
