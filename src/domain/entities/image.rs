//! Domain types for image loading.

use std::sync::Arc;
use std::time::Duration;

/// Identifier of a remote image. The URL itself is the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageUrl(String);

impl ImageUrl {
    /// Creates a new `ImageUrl` from any string-like input.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// Returns the URL as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a short stable digest of the URL, for log fields.
    #[must_use]
    pub fn short_id(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(self.0.as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..16])
    }
}

impl std::fmt::Display for ImageUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ImageUrl {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ImageUrl {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Where an image was resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    /// Served from the in-memory cache without touching the network.
    Cache,
    /// Downloaded and decoded by the loader.
    Network,
}

impl std::fmt::Display for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cache => write!(f, "cache"),
            Self::Network => write!(f, "network"),
        }
    }
}

/// A decoded image ready for display.
#[derive(Clone)]
pub struct LoadedImage {
    /// The URL the image was resolved for.
    pub url: ImageUrl,
    /// The shared decoded image.
    pub image: Arc<image::DynamicImage>,
    /// Bytes of resident memory this image accounts for in the cache.
    pub cost: usize,
    /// Where the image came from.
    pub source: ImageSource,
}

impl LoadedImage {
    /// Wraps a decoded image, computing its byte cost.
    #[must_use]
    pub fn new(url: ImageUrl, image: Arc<image::DynamicImage>, source: ImageSource) -> Self {
        let cost = image_cost(&image);
        Self {
            url,
            image,
            cost,
            source,
        }
    }

    /// Image width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Image height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

impl std::fmt::Debug for LoadedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedImage")
            .field("url", &self.url)
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .field("cost", &self.cost)
            .field("source", &self.source)
            .finish()
    }
}

impl PartialEq for LoadedImage {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url && Arc::ptr_eq(&self.image, &other.image)
    }
}

/// Byte cost of a decoded image: the size of its pixel buffer.
#[must_use]
pub fn image_cost(image: &image::DynamicImage) -> usize {
    image.as_bytes().len()
}

/// Lifecycle of a single image load request.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LoadState {
    /// Created but not started; no network activity.
    #[default]
    Idle,
    /// A fetch is in flight.
    Loading {
        /// 1-based number of the running attempt.
        attempt: u32,
    },
    /// The previous attempt failed and the backoff timer is pending.
    Retrying {
        /// Number of the attempt that just failed.
        attempt: u32,
        /// Delay before the next attempt starts.
        backoff: Duration,
    },
    /// The image is available.
    Succeeded(LoadedImage),
    /// Every attempt failed. Terminal for this request.
    Failed {
        /// Number of fetches that were made.
        attempts: u32,
    },
    /// The owner discarded the request.
    Cancelled,
}

impl LoadState {
    /// Returns true if no further transitions will happen.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded(_) | Self::Failed { .. } | Self::Cancelled
        )
    }

    /// Returns true while a fetch is running or a retry is pending.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. } | Self::Retrying { .. })
    }

    /// Returns true if the image is available.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    /// Returns true if the request permanently failed.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Returns the loaded image, if any.
    #[must_use]
    pub const fn image(&self) -> Option<&LoadedImage> {
        match self {
            Self::Succeeded(image) => Some(image),
            _ => None,
        }
    }
}
