//! Port definition for fetching raw image bytes.

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::entities::ImageUrl;
use crate::domain::errors::FetchError;

/// Port for downloading the encoded bytes of an image.
///
/// Implementations perform a single request per call and apply no retry
/// policy of their own.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageFetchPort: Send + Sync {
    /// Downloads the body behind `url`.
    async fn fetch(&self, url: &ImageUrl) -> Result<Bytes, FetchError>;
}
