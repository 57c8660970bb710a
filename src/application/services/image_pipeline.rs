//! Composition root for image loading.
//!
//! Owns the one shared cache and fetcher and hands out per-consumer loaders.

use std::sync::Arc;

use tracing::info;

use crate::domain::entities::ImageUrl;
use crate::domain::errors::FetchError;
use crate::domain::ports::{ImageCachePort, ImageFetchPort};
use crate::infrastructure::config::ImageConfig;
use crate::infrastructure::image::{
    BoundedImageCache, CacheStats, HttpImageFetcher, ImageLoader, ImageLoaderConfig, size_cdn_url,
};
use crate::presentation::widgets::ImageView;

/// Builds loaders that share one bounded cache.
#[derive(Clone)]
pub struct ImagePipeline {
    cache: Arc<BoundedImageCache>,
    fetcher: Arc<dyn ImageFetchPort>,
    loader_config: ImageLoaderConfig,
    max_width: u32,
}

impl ImagePipeline {
    /// Creates a pipeline from explicit collaborators.
    #[must_use]
    pub fn new(
        cache: Arc<BoundedImageCache>,
        fetcher: Arc<dyn ImageFetchPort>,
        loader_config: ImageLoaderConfig,
        max_width: u32,
    ) -> Self {
        Self {
            cache,
            fetcher,
            loader_config,
            max_width,
        }
    }

    /// Creates a pipeline with an HTTP fetcher from configuration.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn from_config(config: &ImageConfig) -> Result<Self, FetchError> {
        let cache = Arc::new(BoundedImageCache::new(config.cache_limits()));
        let fetcher = Arc::new(HttpImageFetcher::new()?);

        info!(
            max_attempts = config.max_attempts,
            attempt_timeout_secs = config.attempt_timeout_secs,
            retry_backoff_ms = config.retry_backoff_ms,
            cache_count_limit = config.cache_count_limit,
            cache_cost_limit_bytes = config.cache_cost_limit_bytes,
            "Image pipeline ready"
        );

        Ok(Self::new(
            cache,
            fetcher,
            config.loader_config(),
            config.max_width,
        ))
    }

    /// Returns the cache key used for `url`, after CDN sizing.
    #[must_use]
    pub fn resolve_url(&self, url: &str) -> ImageUrl {
        ImageUrl::new(size_cdn_url(url, self.max_width))
    }

    /// Builds an idle loader for `url`.
    #[must_use]
    pub fn loader(&self, url: &str) -> ImageLoader {
        ImageLoader::new(
            self.resolve_url(url),
            self.cache.clone(),
            self.fetcher.clone(),
            self.loader_config,
        )
    }

    /// Builds a view whose loader is already started.
    #[must_use]
    pub fn view(&self, url: &str) -> ImageView {
        ImageView::new(self.clone(), url)
    }

    /// Returns the shared cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<BoundedImageCache> {
        &self.cache
    }

    /// Returns cache statistics.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drops every cached image.
    pub fn clear_cache(&self) {
        self.cache.clear();
        info!("Cleared image cache");
    }
}

impl std::fmt::Debug for ImagePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePipeline")
            .field("loader_config", &self.loader_config)
            .field("max_width", &self.max_width)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
