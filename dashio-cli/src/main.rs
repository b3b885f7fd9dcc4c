use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use dashio_engine::{
    DownloadOrchestrator, DownloadResult, DownloaderConfig, HttpFetcher, SelectionFilter, Summary,
    create_client, summarize,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod cli;
mod error;
mod manifest;
mod utils;

use cli::CliArgs;
use error::AppError;

/// Environment knob bounding number-based segment templates that carry no
/// duration information of their own.
const SEGMENT_COUNT_ENV: &str = "DASH_SEGMENT_COUNT";

fn main() -> ExitCode {
    let outcome = bootstrap();
    match &outcome {
        Ok(summary) if summary.failed > 0 => {
            error!(failed = summary.failed, "run completed with failures");
        }
        Err(e) => eprintln!("Error: {e}"),
        Ok(_) => {}
    }
    ExitCode::from(exit_code(&outcome))
}

/// 0 = every selected target succeeded (or was listed in dry-run);
/// 1 = fatal error before any downloads, including a manifest that yields
/// no targets after addressing and filtering; 2 = the run completed but
/// some targets failed after exhausting their retries.
fn exit_code(outcome: &Result<Summary, AppError>) -> u8 {
    match outcome {
        Ok(summary) if summary.failed == 0 => 0,
        Ok(_) => 2,
        Err(_) => 1,
    }
}

#[tokio::main]
async fn bootstrap() -> Result<Summary, AppError> {
    // Parse command-line arguments
    let args = CliArgs::parse();

    // Setup logging
    let default_directives = if args.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(true)
        .try_init()
        .map_err(|e| AppError::Initialization(e.to_string()))?;

    let segment_count_override = read_segment_count_override();

    // Create the shared download configuration
    let mut config_builder = DownloaderConfig::builder()
        .with_timeout(Duration::from_secs(args.timeout))
        .with_connect_timeout(Duration::from_secs(args.connect_timeout))
        .with_headers(utils::parse_headers(&args.headers))
        .with_concurrency(args.concurrency)
        .with_max_retries(args.retry);
    if let Some(user_agent) = &args.user_agent {
        config_builder = config_builder.with_user_agent(user_agent);
    }
    let config = Arc::new(config_builder.build());

    let client = create_client(&config)?;

    let (body, document_url) =
        manifest::load_manifest(&args.manifest, &client, config.timeout).await?;
    let document = mpd::parse(&body, &document_url)?;
    info!(
        periods = document.periods.len(),
        duration_s = ?document.media_presentation_duration,
        "parsed manifest"
    );

    let targets = mpd::address(&document, segment_count_override);
    ensure_targets_remain(&targets)?;
    info!(targets = targets.len(), "resolved download targets");

    let filter = SelectionFilter::new(args.filter_repr_id, args.filter_mime, args.only_domain);
    let (selected, rejected) = filter.split(targets);
    if !filter.is_unrestricted() {
        info!(
            selected = selected.len(),
            rejected = rejected.len(),
            "applied selection filter"
        );
    }
    // A filter that rejects every addressed target is as fatal as a
    // manifest that addresses nothing.
    ensure_targets_remain(&selected)?;

    if args.dry_run {
        for target in &selected {
            info!(url = %target.url, dest = %args.out.join(&target.rel_path).display(), "would download");
        }
    }

    // First Ctrl-C stops dispatching new targets; in-flight fetches are
    // interrupted through the same token.
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping downloads");
            signal_cancel.cancel();
        }
    });

    let fetcher = Arc::new(HttpFetcher::new(client, config.clone(), args.out.clone()));
    let orchestrator = DownloadOrchestrator::new(fetcher, config.concurrency, cancel);

    let mut results = orchestrator.run(selected, args.dry_run).await;
    results.extend(rejected.into_iter().map(DownloadResult::skipped_by_filter));

    let summary = summarize(&results);
    for failure in &summary.failures {
        warn!(url = %failure.url, error = %failure.error, "failed target");
    }
    info!("{summary}");
    Ok(summary)
}

fn ensure_targets_remain(targets: &[mpd::FetchTarget]) -> Result<(), AppError> {
    if targets.is_empty() {
        Err(AppError::NoTargets)
    } else {
        Ok(())
    }
}

/// Read the segment-count override from the environment, ignoring values
/// that are not a positive integer.
fn read_segment_count_override() -> Option<u64> {
    let raw = std::env::var(SEGMENT_COUNT_ENV).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(count) if count > 0 => {
            info!(count, "using {SEGMENT_COUNT_ENV} for unbounded number templates");
            Some(count)
        }
        _ => {
            warn!(value = %raw, "ignoring invalid {SEGMENT_COUNT_ENV}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use url::Url;

    fn summary_with_failures(failed: usize) -> Summary {
        Summary {
            succeeded: 2,
            failed,
            ..Default::default()
        }
    }

    #[test]
    fn full_success_exits_zero() {
        assert_eq!(exit_code(&Ok(summary_with_failures(0))), 0);
    }

    #[test]
    fn fatal_error_exits_one() {
        assert_eq!(exit_code(&Err(AppError::NoTargets)), 1);
    }

    #[test]
    fn completed_with_failures_exits_two() {
        assert_eq!(exit_code(&Ok(summary_with_failures(3))), 2);
    }

    #[test]
    fn empty_target_set_is_fatal() {
        assert!(matches!(
            ensure_targets_remain(&[]),
            Err(AppError::NoTargets)
        ));

        let target = mpd::FetchTarget {
            url: Url::parse("https://cdn.example/seg.m4s").unwrap(),
            rel_path: PathBuf::from("cdn.example/seg.m4s"),
            repr_id: "v1".to_string(),
            mime_type: None,
        };
        assert!(ensure_targets_remain(&[target]).is_ok());
    }
}
