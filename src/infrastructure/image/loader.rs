//! Per-request image loading state machine.
//!
//! A loader resolves one URL: cache short-circuit, then fetch and decode
//! with a per-attempt timeout and a flat backoff between attempts, until it
//! succeeds or runs out of attempts.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::domain::entities::{ImageSource, ImageUrl, LoadState, LoadedImage};
use crate::domain::errors::FetchError;
use crate::domain::ports::{ImageCachePort, ImageFetchPort};

use super::decode::decode_image;

/// Default number of fetch attempts per request.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default deadline of a single attempt.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default delay between a failed attempt and the next one.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Retry policy of an [`ImageLoader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageLoaderConfig {
    /// Total number of fetches a request may make. Never below one.
    pub max_attempts: u32,
    /// Deadline for one fetch plus decode.
    pub attempt_timeout: Duration,
    /// Flat delay before each retry.
    pub retry_backoff: Duration,
}

impl Default for ImageLoaderConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

/// Loads a single image for one consumer.
///
/// Created in [`LoadState::Idle`]; [`ImageLoader::start`] is the one entry
/// action. Dropping the loader cancels it.
pub struct ImageLoader {
    shared: Arc<Shared>,
}

struct Shared {
    url: ImageUrl,
    cache: Arc<dyn ImageCachePort>,
    fetcher: Arc<dyn ImageFetchPort>,
    config: ImageLoaderConfig,
    state_tx: watch::Sender<LoadState>,
    control: Mutex<Control>,
    fetches: AtomicU32,
}

/// Guarded by one mutex so cancellation and the success commit are ordered.
#[derive(Default)]
struct Control {
    cancelled: bool,
    driver: Option<JoinHandle<()>>,
}

impl ImageLoader {
    /// Creates an idle loader for `url`.
    #[must_use]
    pub fn new(
        url: ImageUrl,
        cache: Arc<dyn ImageCachePort>,
        fetcher: Arc<dyn ImageFetchPort>,
        config: ImageLoaderConfig,
    ) -> Self {
        let config = ImageLoaderConfig {
            max_attempts: config.max_attempts.max(1),
            ..config
        };
        let (state_tx, _) = watch::channel(LoadState::Idle);

        Self {
            shared: Arc::new(Shared {
                url,
                cache,
                fetcher,
                config,
                state_tx,
                control: Mutex::new(Control::default()),
                fetches: AtomicU32::new(0),
            }),
        }
    }

    /// Starts the request.
    ///
    /// A cache hit resolves immediately without any fetch. Otherwise the
    /// loader enters `Loading` and a driver task is spawned. Calls in any
    /// state other than `Idle` are ignored.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime on a cache miss.
    pub fn start(&self) {
        let shared = &self.shared;
        let mut control = shared.control.lock();

        let idle = matches!(*shared.state_tx.borrow(), LoadState::Idle);
        if control.cancelled || !idle {
            trace!(url = %shared.url, "Ignoring start of a loader that is not idle");
            return;
        }

        if let Some(image) = shared.cache.get(&shared.url) {
            debug!(url = %shared.url, "Image resolved from cache");
            shared.state_tx.send_replace(LoadState::Succeeded(LoadedImage::new(
                shared.url.clone(),
                image,
                ImageSource::Cache,
            )));
            return;
        }

        debug!(url = %shared.url, id = %shared.url.short_id(), "Starting image load");
        shared
            .state_tx
            .send_replace(LoadState::Loading { attempt: 1 });
        control.driver = Some(tokio::spawn(Shared::drive(shared.clone())));
    }

    /// Cancels the request.
    ///
    /// Aborts the in-flight fetch and any pending retry. A loader that has
    /// not reached a terminal state moves to `Cancelled`; afterwards it never
    /// changes state again and never writes to the cache.
    pub fn cancel(&self) {
        let shared = &self.shared;
        let mut control = shared.control.lock();
        if control.cancelled {
            return;
        }
        control.cancelled = true;

        if let Some(driver) = control.driver.take() {
            driver.abort();
        }

        let terminal = shared.state_tx.borrow().is_terminal();
        if !terminal {
            debug!(url = %shared.url, "Cancelled image load");
            shared.state_tx.send_replace(LoadState::Cancelled);
        }
    }

    /// Returns a snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> LoadState {
        self.shared.state_tx.borrow().clone()
    }

    /// Returns a receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LoadState> {
        self.shared.state_tx.subscribe()
    }

    /// Waits until the loader reaches a terminal state and returns it.
    ///
    /// Never resolves for a loader that was not started.
    pub async fn wait(&self) -> LoadState {
        let mut rx = self.subscribe();
        match rx.wait_for(LoadState::is_terminal).await {
            Ok(state) => LoadState::clone(&state),
            Err(_) => self.state(),
        }
    }

    /// Returns the URL this loader resolves.
    #[must_use]
    pub fn url(&self) -> &ImageUrl {
        &self.shared.url
    }

    /// Returns the retry policy in effect.
    #[must_use]
    pub fn config(&self) -> ImageLoaderConfig {
        self.shared.config
    }

    /// Returns how many fetches this loader has issued.
    #[must_use]
    pub fn fetch_count(&self) -> u32 {
        self.shared.fetches.load(Ordering::SeqCst)
    }
}

impl Drop for ImageLoader {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for ImageLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageLoader")
            .field("url", &self.shared.url)
            .field("config", &self.shared.config)
            .field("state", &*self.shared.state_tx.borrow())
            .finish_non_exhaustive()
    }
}

impl Shared {
    async fn drive(self: Arc<Self>) {
        let config = self.config;
        let mut attempt = 1;

        loop {
            self.fetches.fetch_add(1, Ordering::SeqCst);

            match self.attempt().await {
                Ok(image) => {
                    self.commit_success(image);
                    return;
                }
                Err(error) => {
                    warn!(
                        url = %self.url,
                        attempt,
                        kind = error.kind(),
                        error = %error,
                        "Image load attempt failed"
                    );
                }
            }

            if attempt >= config.max_attempts {
                if self.publish(LoadState::Failed { attempts: attempt }) {
                    info!(url = %self.url, attempts = attempt, "Giving up on image");
                }
                return;
            }

            if !self.publish(LoadState::Retrying {
                attempt,
                backoff: config.retry_backoff,
            }) {
                return;
            }
            tokio::time::sleep(config.retry_backoff).await;

            attempt += 1;
            if !self.publish(LoadState::Loading { attempt }) {
                return;
            }
        }
    }

    async fn attempt(&self) -> Result<Arc<image::DynamicImage>, FetchError> {
        let timeout = self.config.attempt_timeout;
        let fetch = async {
            let bytes = self.fetcher.fetch(&self.url).await?;
            decode_image(bytes).await
        };

        tokio::time::timeout(timeout, fetch)
            .await
            .map_err(|_| FetchError::Timeout { after: timeout })?
    }

    /// Publishes `state` unless the loader was cancelled.
    fn publish(&self, state: LoadState) -> bool {
        let control = self.control.lock();
        if control.cancelled {
            return false;
        }
        trace!(url = %self.url, state = ?state, "Loader transition");
        self.state_tx.send_replace(state);
        true
    }

    /// Caches a decoded image and publishes success unless cancelled.
    fn commit_success(&self, image: Arc<image::DynamicImage>) {
        let control = self.control.lock();
        if control.cancelled {
            trace!(url = %self.url, "Dropping result of a cancelled load");
            return;
        }

        self.cache.put(self.url.clone(), image.clone());
        let loaded = LoadedImage::new(self.url.clone(), image, ImageSource::Network);
        debug!(
            url = %self.url,
            attempts = self.fetches.load(Ordering::SeqCst),
            cost = loaded.cost,
            "Image loaded successfully"
        );
        self.state_tx.send_replace(LoadState::Succeeded(loaded));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::MockImageFetchPort;
    use crate::domain::ports::mocks::{Scripted, ScriptedFetcher, png_bytes};
    use crate::infrastructure::image::memory_cache::BoundedImageCache;
    use bytes::Bytes;

    const URL: &str = "https://storage.example.com/animals/rex.png";

    fn fast_config() -> ImageLoaderConfig {
        ImageLoaderConfig {
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(10),
            retry_backoff: Duration::ZERO,
        }
    }

    fn loader_with(
        fetcher: Arc<dyn ImageFetchPort>,
        config: ImageLoaderConfig,
    ) -> (ImageLoader, Arc<BoundedImageCache>) {
        let cache = Arc::new(BoundedImageCache::with_default_limits());
        let loader = ImageLoader::new(ImageUrl::new(URL), cache.clone(), fetcher, config);
        (loader, cache)
    }

    async fn wait_for_calls(fetcher: &ScriptedFetcher, calls: u32) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while fetcher.calls() < calls {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("fetch was not issued");
    }

    #[tokio::test]
    async fn test_always_failing_fetch_exhausts_budget() {
        let fetcher = Arc::new(ScriptedFetcher::always_failing());
        let (loader, cache) = loader_with(fetcher.clone(), fast_config());

        loader.start();
        let state = loader.wait().await;

        assert_eq!(state, LoadState::Failed { attempts: 3 });
        assert_eq!(fetcher.calls(), 3);
        assert_eq!(loader.fetch_count(), 3);
        assert!(cache.is_empty());

        tokio::time::sleep(Duration::from_millis(20)).await;
        loader.start();
        tokio::task::yield_now().await;
        assert_eq!(fetcher.calls(), 3);
        assert_eq!(loader.state(), LoadState::Failed { attempts: 3 });
    }

    #[tokio::test]
    async fn test_fail_once_then_succeed() {
        let fetcher = Arc::new(ScriptedFetcher::new(
            vec![Scripted::Fail(FetchError::Status { status: 503 })],
            Scripted::Bytes(png_bytes(4, 3)),
        ));
        let (loader, cache) = loader_with(fetcher.clone(), fast_config());

        loader.start();
        let state = loader.wait().await;

        let loaded = state.image().expect("image loaded");
        assert_eq!((loaded.width(), loaded.height()), (4, 3));
        assert_eq!(loaded.source, ImageSource::Network);
        assert_eq!(fetcher.calls(), 2);
        assert!(
            cache
                .peek(&ImageUrl::new(URL))
                .is_some_and(|img| Arc::ptr_eq(&img, &loaded.image))
        );
    }

    #[tokio::test]
    async fn test_decode_failure_is_retried() {
        let fetcher = Arc::new(ScriptedFetcher::new(
            vec![Scripted::Bytes(Bytes::from_static(b"<html>oops</html>"))],
            Scripted::Bytes(png_bytes(2, 2)),
        ));
        let (loader, _cache) = loader_with(fetcher.clone(), fast_config());

        loader.start();
        assert!(loader.wait().await.is_ready());
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_cache_hit_short_circuits() {
        let mut mock = MockImageFetchPort::new();
        mock.expect_fetch().never();
        let (loader, cache) = loader_with(Arc::new(mock), fast_config());

        let img = Arc::new(image::DynamicImage::new_rgb8(5, 5));
        cache.put(ImageUrl::new(URL), img.clone());

        loader.start();

        let state = loader.state();
        let loaded = state.image().expect("resolved synchronously");
        assert_eq!(loaded.source, ImageSource::Cache);
        assert!(Arc::ptr_eq(&loaded.image, &img));
        assert_eq!(loader.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_fetch_called_exactly_max_attempts() {
        let mut mock = MockImageFetchPort::new();
        mock.expect_fetch()
            .withf(|url| url.as_str() == URL)
            .times(2)
            .returning(|_| Err(FetchError::network("connection reset")));
        let config = ImageLoaderConfig {
            max_attempts: 2,
            ..fast_config()
        };
        let (loader, _cache) = loader_with(Arc::new(mock), config);

        loader.start();
        assert_eq!(loader.wait().await, LoadState::Failed { attempts: 2 });
    }

    #[tokio::test]
    async fn test_duplicate_start_issues_one_fetch() {
        let fetcher = Arc::new(ScriptedFetcher::new(
            Vec::new(),
            Scripted::Gated(png_bytes(1, 1)),
        ));
        let (loader, _cache) = loader_with(fetcher.clone(), fast_config());

        loader.start();
        loader.start();
        wait_for_calls(&fetcher, 1).await;
        loader.start();
        assert_eq!(loader.state(), LoadState::Loading { attempt: 1 });

        fetcher.release();
        assert!(loader.wait().await.is_ready());
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_cancel_while_loading_is_silent() {
        let fetcher = Arc::new(ScriptedFetcher::new(
            Vec::new(),
            Scripted::Gated(png_bytes(1, 1)),
        ));
        let (loader, cache) = loader_with(fetcher.clone(), fast_config());
        let rx = loader.subscribe();

        loader.start();
        wait_for_calls(&fetcher, 1).await;
        loader.cancel();
        assert_eq!(loader.state(), LoadState::Cancelled);

        fetcher.release();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(cache.is_empty());
        assert_eq!(*rx.borrow(), LoadState::Cancelled);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_cancel_while_retrying_stops_timer() {
        let fetcher = Arc::new(ScriptedFetcher::always_failing());
        let config = ImageLoaderConfig {
            retry_backoff: Duration::from_secs(60),
            ..fast_config()
        };
        let (loader, cache) = loader_with(fetcher.clone(), config);
        let mut rx = loader.subscribe();

        loader.start();
        rx.wait_for(|s| matches!(s, LoadState::Retrying { attempt: 1, .. }))
            .await
            .expect("loader alive");
        loader.cancel();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(loader.state(), LoadState::Cancelled);
        assert_eq!(fetcher.calls(), 1);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_stale_result_after_cancel_is_discarded() {
        let fetcher = Arc::new(ScriptedFetcher::always_failing());
        let (loader, cache) = loader_with(fetcher, fast_config());

        loader.cancel();
        loader
            .shared
            .commit_success(Arc::new(image::DynamicImage::new_rgb8(2, 2)));

        assert!(cache.is_empty());
        assert_eq!(loader.state(), LoadState::Cancelled);
        assert!(!loader.shared.publish(LoadState::Loading { attempt: 2 }));
    }

    #[tokio::test]
    async fn test_drop_cancels_in_flight_fetch() {
        let fetcher = Arc::new(ScriptedFetcher::new(
            Vec::new(),
            Scripted::Gated(png_bytes(1, 1)),
        ));
        let (loader, cache) = loader_with(fetcher.clone(), fast_config());

        loader.start();
        wait_for_calls(&fetcher, 1).await;
        drop(loader);

        fetcher.release();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_after_success_keeps_image() {
        let fetcher = Arc::new(ScriptedFetcher::new(
            Vec::new(),
            Scripted::Bytes(png_bytes(1, 1)),
        ));
        let (loader, cache) = loader_with(fetcher, fast_config());

        loader.start();
        assert!(loader.wait().await.is_ready());
        loader.cancel();

        assert!(loader.state().is_ready());
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failed_attempt() {
        let fetcher = Arc::new(ScriptedFetcher::new(Vec::new(), Scripted::Hang));
        let config = ImageLoaderConfig {
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(10),
            retry_backoff: Duration::from_secs(1),
        };
        let (loader, _cache) = loader_with(fetcher.clone(), config);
        let started = tokio::time::Instant::now();

        loader.start();
        assert_eq!(loader.wait().await, LoadState::Failed { attempts: 3 });

        assert_eq!(fetcher.calls(), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(32));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_is_flat_between_attempts() {
        let fetcher = Arc::new(ScriptedFetcher::always_failing());
        let config = ImageLoaderConfig {
            max_attempts: 4,
            attempt_timeout: Duration::from_secs(10),
            retry_backoff: Duration::from_secs(1),
        };
        let (loader, _cache) = loader_with(fetcher.clone(), config);
        let started = tokio::time::Instant::now();

        loader.start();
        assert_eq!(loader.wait().await, LoadState::Failed { attempts: 4 });

        assert_eq!(fetcher.calls(), 4);
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_zero_max_attempts_still_fetches_once() {
        let fetcher = Arc::new(ScriptedFetcher::always_failing());
        let config = ImageLoaderConfig {
            max_attempts: 0,
            ..fast_config()
        };
        let (loader, _cache) = loader_with(fetcher.clone(), config);

        loader.start();
        assert_eq!(loader.wait().await, LoadState::Failed { attempts: 1 });
        assert_eq!(fetcher.calls(), 1);
    }
}
