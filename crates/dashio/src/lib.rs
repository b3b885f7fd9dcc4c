//! # dashio-engine
//!
//! Download engine for mirroring the assets referenced by an MPEG-DASH
//! manifest: a shared HTTP client, allowlist filtering, per-target fetching
//! with retry/backoff, a bounded-concurrency scheduler, and run reporting.

pub mod builder;
pub mod client;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod filter;
pub mod report;
pub mod scheduler;

pub use builder::DownloaderConfigBuilder;
pub use client::create_client;
pub use config::DownloaderConfig;
pub use error::DownloadError;
pub use fetcher::{HttpFetcher, TargetFetcher};
pub use filter::SelectionFilter;
pub use report::{DownloadResult, Summary, TargetStatus, summarize};
pub use scheduler::DownloadOrchestrator;
