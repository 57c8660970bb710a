//! Image handling infrastructure.
//!
//! This module provides:
//! - Memory caching bounded by entry count and byte cost
//! - HTTP fetching of encoded images
//! - CMS CDN URL sizing
//! - The per-request retrying loader

pub mod cms_cdn;
pub mod decode;
pub mod http_fetcher;
pub mod loader;
pub mod memory_cache;

pub use cms_cdn::{is_cms_cdn_url, size_cdn_url, size_cdn_url_default};
pub use decode::decode_image;
pub use http_fetcher::HttpImageFetcher;
pub use loader::{ImageLoader, ImageLoaderConfig};
pub use memory_cache::{BoundedImageCache, CacheLimits, CacheStats};
