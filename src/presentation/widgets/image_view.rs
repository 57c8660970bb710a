//! Image slot of an animal card or article body.

use tokio::sync::watch;

use crate::application::ImagePipeline;
use crate::domain::entities::{LoadState, LoadedImage};
use crate::infrastructure::image::ImageLoader;

/// What an image slot should render.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageDisplay {
    /// Loading or retrying; show the neutral placeholder.
    Placeholder,
    /// The decoded image.
    Image(LoadedImage),
    /// Every attempt failed; show the "could not load" affordance.
    LoadFailed,
}

impl ImageDisplay {
    /// Maps a loader state to what the slot shows.
    #[must_use]
    pub fn from_state(state: &LoadState) -> Self {
        match state {
            LoadState::Succeeded(image) => Self::Image(image.clone()),
            LoadState::Failed { .. } => Self::LoadFailed,
            LoadState::Idle
            | LoadState::Loading { .. }
            | LoadState::Retrying { .. }
            | LoadState::Cancelled => Self::Placeholder,
        }
    }
}

/// One image-bearing view. Owns its loader for as long as it lives.
pub struct ImageView {
    pipeline: ImagePipeline,
    url: String,
    loader: ImageLoader,
}

impl ImageView {
    /// Creates the view and starts loading its image.
    #[must_use]
    pub fn new(pipeline: ImagePipeline, url: impl Into<String>) -> Self {
        let url = url.into();
        let loader = pipeline.loader(&url);
        loader.start();
        Self {
            pipeline,
            url,
            loader,
        }
    }

    /// Returns what should be rendered right now.
    #[must_use]
    pub fn display(&self) -> ImageDisplay {
        ImageDisplay::from_state(&self.loader.state())
    }

    /// Returns the URL the view was created with.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the current loader state.
    #[must_use]
    pub fn state(&self) -> LoadState {
        self.loader.state()
    }

    /// Returns a receiver notified whenever the loader changes state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LoadState> {
        self.loader.subscribe()
    }

    /// Waits until the image resolves or permanently fails.
    pub async fn wait(&self) -> ImageDisplay {
        ImageDisplay::from_state(&self.loader.wait().await)
    }

    /// Starts over with a fresh request after a failure.
    ///
    /// Returns false and does nothing unless the view is showing the failure
    /// affordance.
    pub fn retry(&mut self) -> bool {
        if !self.loader.state().is_failed() {
            return false;
        }
        let loader = self.pipeline.loader(&self.url);
        loader.start();
        self.loader = loader;
        true
    }
}

impl std::fmt::Debug for ImageView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageView")
            .field("url", &self.url)
            .field("loader", &self.loader)
            .finish_non_exhaustive()
    }
}
