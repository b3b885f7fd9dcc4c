use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};

/// Configurable options for the downloader
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Per-attempt deadline for a single HTTP request
    pub timeout: Duration,

    /// Connection timeout (time to establish initial connection)
    pub connect_timeout: Duration,

    /// Whether to follow redirects
    pub follow_redirects: bool,

    /// User agent string
    pub user_agent: String,

    /// Custom HTTP headers for requests
    pub headers: HeaderMap,

    /// Hard cap on concurrently in-flight fetches
    pub concurrency: usize,

    /// Additional attempts after the first failure of a target
    pub max_retries: u32,

    /// Base delay for exponential backoff between retries
    pub retry_delay_base: Duration,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            follow_redirects: true,
            user_agent: format!("dashio/{}", env!("CARGO_PKG_VERSION")),
            headers: DownloaderConfig::default_headers(),
            concurrency: 8,
            max_retries: 3,
            retry_delay_base: Duration::from_secs(1),
        }
    }
}

impl DownloaderConfig {
    pub fn builder() -> crate::builder::DownloaderConfigBuilder {
        crate::builder::DownloaderConfigBuilder::new()
    }

    pub fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert(
            reqwest::header::ACCEPT_ENCODING,
            HeaderValue::from_static("gzip, deflate"),
        );

        headers.insert(
            reqwest::header::CONNECTION,
            HeaderValue::from_static("keep-alive"),
        );

        headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static("*/*"));

        headers
    }
}
