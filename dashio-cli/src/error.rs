use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Manifest error: {0}")]
    Manifest(#[from] mpd::MpdError),

    #[error("Download error: {0}")]
    Download(#[from] dashio_engine::DownloadError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("manifest yielded no downloadable targets")]
    NoTargets,
}
