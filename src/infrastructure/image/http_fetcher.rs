//! HTTP adapter for [`ImageFetchPort`].

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tracing::debug;

use crate::domain::entities::ImageUrl;
use crate::domain::errors::FetchError;
use crate::domain::ports::ImageFetchPort;

const USER_AGENT: &str = concat!("pawprint/", env!("CARGO_PKG_VERSION"));

/// Connect timeout. The per-attempt deadline is enforced by the loader.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Downloads image bytes with a single GET per call.
#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    client: Client,
}

impl HttpImageFetcher {
    /// Creates a fetcher with its own HTTP client.
    ///
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| FetchError::network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ImageFetchPort for HttpImageFetcher {
    async fn fetch(&self, url: &ImageUrl) -> Result<Bytes, FetchError> {
        debug!(url = %url, "Downloading image");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| FetchError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        response
            .bytes()
            .await
            .map_err(|e| FetchError::body(e.to_string()))
    }
}
