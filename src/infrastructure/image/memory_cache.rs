//! In-memory LRU image cache bounded by entry count and byte cost.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::domain::entities::{ImageUrl, image_cost};
use crate::domain::ports::ImageCachePort;

/// Default maximum number of images to cache in memory.
pub const DEFAULT_COUNT_LIMIT: usize = 100;

/// Default maximum aggregate byte cost (100 MiB).
pub const DEFAULT_COST_LIMIT: usize = 100 * 1024 * 1024;

/// Resource bounds of a [`BoundedImageCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheLimits {
    /// Maximum number of entries. Never below one.
    pub max_entries: usize,
    /// Maximum sum of entry costs in bytes.
    pub max_cost: usize,
}

impl CacheLimits {
    /// Creates limits, clamping the entry count to at least one.
    #[must_use]
    pub const fn new(max_entries: usize, max_cost: usize) -> Self {
        Self {
            max_entries: if max_entries == 0 { 1 } else { max_entries },
            max_cost,
        }
    }
}

impl Default for CacheLimits {
    fn default() -> Self {
        Self::new(DEFAULT_COUNT_LIMIT, DEFAULT_COST_LIMIT)
    }
}

struct CacheEntry {
    image: Arc<image::DynamicImage>,
    cost: usize,
}

struct Inner {
    entries: LruCache<ImageUrl, CacheEntry>,
    total_cost: usize,
}

impl Inner {
    fn take(&mut self, url: &ImageUrl) -> Option<CacheEntry> {
        let entry = self.entries.pop(url)?;
        self.total_cost -= entry.cost;
        Some(entry)
    }
}

/// In-memory LRU cache for decoded images.
///
/// Every operation takes one mutex, so concurrent callers never observe a
/// torn state. Least recently used entries are evicted first.
pub struct BoundedImageCache {
    inner: Mutex<Inner>,
    limits: CacheLimits,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl BoundedImageCache {
    /// Creates a new cache with the given bounds.
    #[must_use]
    pub fn new(limits: CacheLimits) -> Self {
        let limits = CacheLimits::new(limits.max_entries, limits.max_cost);
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::unbounded(),
                total_cost: 0,
            }),
            limits,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Creates a new cache with the default bounds.
    #[must_use]
    pub fn with_default_limits() -> Self {
        Self::new(CacheLimits::default())
    }

    /// Returns the configured bounds.
    #[must_use]
    pub const fn limits(&self) -> CacheLimits {
        self.limits
    }

    /// Peeks at an image without promoting it in the LRU or counting a hit.
    #[must_use]
    pub fn peek(&self, url: &ImageUrl) -> Option<Arc<image::DynamicImage>> {
        let inner = self.inner.lock();
        inner.entries.peek(url).map(|entry| entry.image.clone())
    }

    /// Returns true if `url` is cached, without promoting it.
    #[must_use]
    pub fn contains(&self, url: &ImageUrl) -> bool {
        self.inner.lock().entries.contains(url)
    }

    /// Returns cache statistics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        let (size, total_cost) = {
            let inner = self.inner.lock();
            (inner.entries.len(), inner.total_cost)
        };
        CacheStats {
            hits,
            misses,
            evictions: self.evictions.load(Ordering::Relaxed),
            hit_rate,
            size,
            total_cost,
        }
    }
}

impl Default for BoundedImageCache {
    fn default() -> Self {
        Self::with_default_limits()
    }
}

impl std::fmt::Debug for BoundedImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedImageCache")
            .field("limits", &self.limits)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Statistics about cache performance.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries evicted to stay within bounds.
    pub evictions: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
    /// Current number of cached images.
    pub size: usize,
    /// Current aggregate byte cost.
    pub total_cost: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cache: {} images, {} bytes, {:.1}% hit rate ({} hits, {} misses, {} evictions)",
            self.size, self.total_cost, self.hit_rate, self.hits, self.misses, self.evictions
        )
    }
}

impl ImageCachePort for BoundedImageCache {
    fn get(&self, url: &ImageUrl) -> Option<Arc<image::DynamicImage>> {
        let mut inner = self.inner.lock();
        if let Some(entry) = inner.entries.get(url) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(url = %url, "Memory cache hit");
            Some(entry.image.clone())
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(url = %url, "Memory cache miss");
            None
        }
    }

    fn put(&self, url: ImageUrl, image: Arc<image::DynamicImage>) -> bool {
        let cost = image_cost(&image);
        if cost > self.limits.max_cost {
            warn!(
                url = %url,
                cost,
                max_cost = self.limits.max_cost,
                "Image exceeds cache cost limit, not caching"
            );
            return false;
        }

        let mut inner = self.inner.lock();
        inner.take(&url);

        while inner.entries.len() >= self.limits.max_entries
            || inner.total_cost.saturating_add(cost) > self.limits.max_cost
        {
            let Some((evicted, entry)) = inner.entries.pop_lru() else {
                break;
            };
            inner.total_cost -= entry.cost;
            self.evictions.fetch_add(1, Ordering::Relaxed);
            trace!(url = %evicted, cost = entry.cost, "Evicted image from memory cache");
        }

        debug!(url = %url, cost, "Storing image in memory cache");
        inner.entries.put(url, CacheEntry { image, cost });
        inner.total_cost = inner.total_cost.saturating_add(cost);
        true
    }

    fn remove(&self, url: &ImageUrl) {
        let mut inner = self.inner.lock();
        if inner.take(url).is_some() {
            debug!(url = %url, "Removed image from memory cache");
        }
    }

    fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.total_cost = 0;
        debug!("Cleared memory image cache");
    }

    fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    fn total_cost(&self) -> usize {
        self.inner.lock().total_cost
    }
}
