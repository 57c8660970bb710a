//! Domain layer with core image types, errors and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;

pub use entities::{ImageSource, ImageUrl, LoadState, LoadedImage};
pub use errors::FetchError;
pub use ports::{ImageCachePort, ImageFetchPort};
