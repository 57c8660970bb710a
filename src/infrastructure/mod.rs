//! Infrastructure layer with external service adapters.

/// Application configuration.
pub mod config;
/// Image handling (caching, fetching, loading, CDN sizing).
pub mod image;

pub use config::{AppConfig, CliArgs, ConfigError, ImageConfig, LogLevel, StorageManager};
pub use self::image::{
    BoundedImageCache, CacheLimits, CacheStats, HttpImageFetcher, ImageLoader, ImageLoaderConfig,
    size_cdn_url,
};
