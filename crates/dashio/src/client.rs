use reqwest::Client;
use tracing::debug;

use crate::{DownloadError, DownloaderConfig};

/// Create a reqwest Client with the provided configuration.
///
/// The per-attempt deadline is applied per request by the fetcher, not
/// here, so a slow target cannot starve unrelated requests on the shared
/// client.
pub fn create_client(config: &DownloaderConfig) -> Result<Client, DownloadError> {
    let mut client_builder = Client::builder()
        .pool_max_idle_per_host(config.concurrency.max(1))
        .user_agent(&config.user_agent)
        .default_headers(config.headers.clone())
        .redirect(if config.follow_redirects {
            reqwest::redirect::Policy::limited(10)
        } else {
            reqwest::redirect::Policy::none()
        });

    if !config.connect_timeout.is_zero() {
        client_builder = client_builder.connect_timeout(config.connect_timeout);
    }

    debug!(
        user_agent = %config.user_agent,
        connect_timeout = ?config.connect_timeout,
        "building shared HTTP client"
    );

    client_builder.build().map_err(DownloadError::from)
}
