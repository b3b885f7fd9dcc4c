// Bounded-concurrency dispatch of fetch targets.

use std::sync::Arc;

use futures::{StreamExt, stream};
use mpd::FetchTarget;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::DownloadError;
use crate::fetcher::TargetFetcher;
use crate::report::DownloadResult;

/// Drives a set of fetch targets through a shared fetcher with at most
/// `concurrency` fetches in flight. Failures are isolated per target; the
/// run always yields one result per input target.
pub struct DownloadOrchestrator {
    fetcher: Arc<dyn TargetFetcher>,
    concurrency: usize,
    cancel: CancellationToken,
}

impl DownloadOrchestrator {
    pub fn new(fetcher: Arc<dyn TargetFetcher>, concurrency: usize, cancel: CancellationToken) -> Self {
        Self {
            fetcher,
            concurrency: concurrency.max(1),
            cancel,
        }
    }

    /// Run every target to a terminal status. In dry-run mode no fetcher
    /// call is made at all.
    pub async fn run(&self, targets: Vec<FetchTarget>, dry_run: bool) -> Vec<DownloadResult> {
        if dry_run {
            info!(targets = targets.len(), "dry run, skipping all fetches");
            return targets
                .into_iter()
                .map(DownloadResult::skipped_dry_run)
                .collect();
        }

        info!(
            targets = targets.len(),
            concurrency = self.concurrency,
            "starting download run"
        );

        let results: Vec<DownloadResult> = stream::iter(targets)
            .map(|target| {
                let fetcher = self.fetcher.clone();
                let cancel = self.cancel.clone();
                async move {
                    // Targets still queued when cancellation lands are
                    // finalized without dispatching a fetch.
                    if cancel.is_cancelled() {
                        return DownloadResult::failed(target, 0, DownloadError::Cancelled);
                    }
                    fetcher.fetch(&target, cancel).await
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        debug!(results = results.len(), "download run finished");
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::TargetStatus;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use url::Url;

    fn targets(n: usize) -> Vec<FetchTarget> {
        (0..n)
            .map(|i| {
                let url = Url::parse(&format!("https://cdn.example/seg-{i}.m4s")).unwrap();
                FetchTarget {
                    rel_path: PathBuf::from(format!("cdn.example/seg-{i}.m4s")),
                    repr_id: "v1".to_string(),
                    mime_type: None,
                    url,
                }
            })
            .collect()
    }

    /// Counts in-flight and total fetches; every fetch succeeds.
    struct CountingFetcher {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        total: AtomicUsize,
    }

    impl CountingFetcher {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                total: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TargetFetcher for CountingFetcher {
        async fn fetch(&self, target: &FetchTarget, _cancel: CancellationToken) -> DownloadResult {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.total.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            DownloadResult::success(target.clone(), 1, 100)
        }
    }

    #[tokio::test]
    async fn dry_run_never_touches_the_fetcher() {
        let fetcher = Arc::new(CountingFetcher::new());
        let orchestrator =
            DownloadOrchestrator::new(fetcher.clone(), 4, CancellationToken::new());

        let results = orchestrator.run(targets(5), true).await;

        assert_eq!(results.len(), 5);
        assert!(
            results
                .iter()
                .all(|r| r.status == TargetStatus::SkippedDryRun)
        );
        assert_eq!(fetcher.total.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn in_flight_fetches_never_exceed_the_cap() {
        let fetcher = Arc::new(CountingFetcher::new());
        let orchestrator =
            DownloadOrchestrator::new(fetcher.clone(), 3, CancellationToken::new());

        let results = orchestrator.run(targets(12), false).await;

        assert_eq!(results.len(), 12);
        assert!(results.iter().all(|r| r.status == TargetStatus::Success));
        assert_eq!(fetcher.total.load(Ordering::SeqCst), 12);
        assert!(fetcher.max_in_flight.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn pre_cancelled_run_dispatches_nothing() {
        let fetcher = Arc::new(CountingFetcher::new());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let orchestrator = DownloadOrchestrator::new(fetcher.clone(), 4, cancel);

        let results = orchestrator.run(targets(6), false).await;

        assert_eq!(results.len(), 6);
        assert!(results.iter().all(|r| r.status == TargetStatus::Failed));
        assert!(
            results
                .iter()
                .all(|r| r.error.as_deref() == Some("operation cancelled"))
        );
        assert_eq!(fetcher.total.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn filtered_out_hosts_are_never_dispatched() {
        use crate::filter::SelectionFilter;
        use std::sync::Mutex;

        struct RecordingFetcher {
            urls: Mutex<Vec<String>>,
        }

        #[async_trait]
        impl TargetFetcher for RecordingFetcher {
            async fn fetch(
                &self,
                target: &FetchTarget,
                _cancel: CancellationToken,
            ) -> DownloadResult {
                self.urls.lock().unwrap().push(target.url.to_string());
                DownloadResult::success(target.clone(), 1, 10)
            }
        }

        let mut all = targets(2);
        all.push(FetchTarget {
            rel_path: PathBuf::from("evil.example/seg.m4s"),
            repr_id: "v1".to_string(),
            mime_type: None,
            url: Url::parse("https://evil.example/seg.m4s").unwrap(),
        });

        let filter = SelectionFilter::new(vec![], vec![], vec!["cdn.example".into()]);
        let (selected, rejected) = filter.split(all);
        assert_eq!(rejected.len(), 1);

        let fetcher = Arc::new(RecordingFetcher {
            urls: Mutex::new(Vec::new()),
        });
        let orchestrator =
            DownloadOrchestrator::new(fetcher.clone(), 4, CancellationToken::new());
        let results = orchestrator.run(selected, false).await;

        assert_eq!(results.len(), 2);
        let fetched = fetcher.urls.lock().unwrap();
        assert!(fetched.iter().all(|u| u.contains("cdn.example")));
        assert!(!fetched.iter().any(|u| u.contains("evil.example")));
    }

    #[tokio::test]
    async fn empty_target_list_yields_empty_results() {
        let fetcher = Arc::new(CountingFetcher::new());
        let orchestrator =
            DownloadOrchestrator::new(fetcher, 4, CancellationToken::new());

        let results = orchestrator.run(Vec::new(), false).await;
        assert!(results.is_empty());
    }
}
