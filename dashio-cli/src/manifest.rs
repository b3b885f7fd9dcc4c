use std::path::Path;
use std::time::Duration;

use dashio_engine::DownloadError;
use tracing::{debug, info};
use url::Url;

use crate::error::AppError;

/// Load the manifest body together with its document URL. The document URL
/// is the base every relative BaseURL in the manifest resolves against, so
/// local files are canonicalized into `file://` URLs. The remote fetch gets
/// the same per-attempt deadline as every media request, so a stalled
/// manifest server cannot hang the run.
pub async fn load_manifest(
    location: &str,
    client: &reqwest::Client,
    timeout: Duration,
) -> Result<(String, Url), AppError> {
    if let Ok(url) = Url::parse(location)
        && matches!(url.scheme(), "http" | "https")
    {
        info!(url = %url, "fetching manifest");
        let response = client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(DownloadError::from)?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Download(DownloadError::Status(status)));
        }
        let body = response.text().await.map_err(DownloadError::from)?;
        return Ok((body, url));
    }

    let path = Path::new(location);
    debug!(path = %path.display(), "reading local manifest");
    let body = tokio::fs::read_to_string(path).await?;
    let absolute = tokio::fs::canonicalize(path).await?;
    let url = Url::from_file_path(&absolute).map_err(|_| {
        AppError::InvalidInput(format!("cannot derive a file URL from '{location}'"))
    })?;
    Ok((body, url))
}
