use reqwest::StatusCode;

// Custom error type for download operations
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned status code {0}")]
    Status(StatusCode),

    #[error("filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),

    #[error("operation cancelled")]
    Cancelled,
}

impl DownloadError {
    /// Whether another fetch attempt could succeed. Transport failures,
    /// timeouts and bad statuses are retried; filesystem errors already got
    /// their single write retry, and cancellation is terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DownloadError::Http(_) | DownloadError::Status(_))
    }
}
