//! # Builder for DownloaderConfig
//!
//! Fluent API for creating and customizing [`DownloaderConfig`] instances.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};

use crate::DownloaderConfig;

/// Builder for creating DownloaderConfig instances with a fluent API
#[derive(Debug, Clone)]
pub struct DownloaderConfigBuilder {
    config: DownloaderConfig,
}

impl DownloaderConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: DownloaderConfig::default(),
        }
    }

    /// Set the per-attempt request deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the connection timeout (time to establish initial connection)
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set whether to follow redirects
    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.config.follow_redirects = follow;
        self
    }

    /// Set the user agent string
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Add a custom HTTP header
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            name.as_ref().parse::<reqwest::header::HeaderName>(),
            HeaderValue::from_str(value.as_ref()),
        ) {
            self.config.headers.insert(name, value);
        }
        self
    }

    /// Merge a set of HTTP headers into the configured defaults
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        for (name, value) in headers.iter() {
            self.config.headers.insert(name.clone(), value.clone());
        }
        self
    }

    /// Set the maximum number of concurrently in-flight fetches
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency.max(1);
        self
    }

    /// Set the number of retries after a failed fetch attempt
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set the base delay for exponential backoff between retries
    pub fn with_retry_delay_base(mut self, delay: Duration) -> Self {
        self.config.retry_delay_base = delay;
        self
    }

    /// Build the DownloaderConfig instance
    pub fn build(self) -> DownloaderConfig {
        self.config
    }
}

impl Default for DownloaderConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = DownloaderConfigBuilder::new().build();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay_base, Duration::from_secs(1));
        assert!(config.follow_redirects);
    }

    #[test]
    fn test_builder_customization() {
        let config = DownloaderConfigBuilder::new()
            .with_timeout(Duration::from_secs(60))
            .with_connect_timeout(Duration::from_secs(20))
            .with_follow_redirects(false)
            .with_user_agent("CustomUserAgent/1.0")
            .with_header("X-Custom-Header", "CustomValue")
            .with_concurrency(4)
            .with_max_retries(5)
            .build();

        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.connect_timeout, Duration::from_secs(20));
        assert!(!config.follow_redirects);
        assert_eq!(config.user_agent, "CustomUserAgent/1.0");
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.max_retries, 5);

        let header_value = config.headers.get("X-Custom-Header").unwrap();
        assert_eq!(header_value.to_str().unwrap(), "CustomValue");
    }

    #[test]
    fn test_concurrency_floor_is_one() {
        let config = DownloaderConfigBuilder::new().with_concurrency(0).build();
        assert_eq!(config.concurrency, 1);
    }

    #[test]
    fn test_merged_headers_keep_defaults() {
        let mut extra = HeaderMap::new();
        extra.insert("X-Token", HeaderValue::from_static("abc"));
        let config = DownloaderConfigBuilder::new().with_headers(extra).build();

        assert!(config.headers.get("X-Token").is_some());
        assert!(config.headers.get(reqwest::header::ACCEPT).is_some());
    }
}
