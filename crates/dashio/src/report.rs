// Per-target outcomes and end-of-run aggregation.

use std::fmt;

use mpd::FetchTarget;

/// Terminal status of one fetch target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetStatus {
    Success,
    Failed,
    SkippedByFilter,
    SkippedDryRun,
}

/// Finalized outcome for one target. Created when the orchestrator reaches
/// a terminal status for the target and never modified afterwards.
#[derive(Debug, Clone)]
pub struct DownloadResult {
    pub target: FetchTarget,
    pub status: TargetStatus,
    pub bytes_written: u64,
    pub attempts: u32,
    pub error: Option<String>,
}

impl DownloadResult {
    pub fn success(target: FetchTarget, attempts: u32, bytes_written: u64) -> Self {
        Self {
            target,
            status: TargetStatus::Success,
            bytes_written,
            attempts,
            error: None,
        }
    }

    pub fn failed(target: FetchTarget, attempts: u32, error: impl fmt::Display) -> Self {
        Self {
            target,
            status: TargetStatus::Failed,
            bytes_written: 0,
            attempts,
            error: Some(error.to_string()),
        }
    }

    pub fn skipped_by_filter(target: FetchTarget) -> Self {
        Self {
            target,
            status: TargetStatus::SkippedByFilter,
            bytes_written: 0,
            attempts: 0,
            error: None,
        }
    }

    pub fn skipped_dry_run(target: FetchTarget) -> Self {
        Self {
            target,
            status: TargetStatus::SkippedDryRun,
            bytes_written: 0,
            attempts: 0,
            error: None,
        }
    }
}

/// One failed target surfaced for user display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedTarget {
    pub url: String,
    pub error: String,
}

/// Aggregated run outcome. Order-independent: any permutation of the same
/// results produces the same counts and byte total.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped_by_filter: usize,
    pub skipped_dry_run: usize,
    pub bytes_written: u64,
    pub failures: Vec<FailedTarget>,
}

/// Pure aggregation of finalized results.
pub fn summarize(results: &[DownloadResult]) -> Summary {
    let mut summary = Summary::default();
    for result in results {
        match result.status {
            TargetStatus::Success => summary.succeeded += 1,
            TargetStatus::Failed => {
                summary.failed += 1;
                summary.failures.push(FailedTarget {
                    url: result.target.url.to_string(),
                    error: result
                        .error
                        .clone()
                        .unwrap_or_else(|| "unknown error".to_string()),
                });
            }
            TargetStatus::SkippedByFilter => summary.skipped_by_filter += 1,
            TargetStatus::SkippedDryRun => summary.skipped_dry_run += 1,
        }
        summary.bytes_written += result.bytes_written;
    }
    summary
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "success: {}, failed: {}, skipped by filter: {}, skipped (dry-run): {}, bytes written: {}",
            self.succeeded,
            self.failed,
            self.skipped_by_filter,
            self.skipped_dry_run,
            self.bytes_written
        )
    }
}
