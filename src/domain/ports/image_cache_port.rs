//! Port definition for image caching.

use std::sync::Arc;

use crate::domain::entities::ImageUrl;

/// Port for a bounded in-memory image store.
///
/// Implementations must be thread-safe and must never block on I/O.
/// None of the operations can fail.
pub trait ImageCachePort: Send + Sync {
    /// Returns the cached image, marking it as recently used.
    fn get(&self, url: &ImageUrl) -> Option<Arc<image::DynamicImage>>;

    /// Stores an image and evicts other entries until the cache is within
    /// its bounds again. Returns false if the image was not stored.
    fn put(&self, url: ImageUrl, image: Arc<image::DynamicImage>) -> bool;

    /// Removes an image from the cache. No-op when absent.
    fn remove(&self, url: &ImageUrl);

    /// Clears all images from the cache.
    fn clear(&self);

    /// Returns the current number of cached images.
    fn len(&self) -> usize;

    /// Returns true if the cache is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the aggregate byte cost of all cached images.
    fn total_cost(&self) -> usize;
}
