//! Domain entity definitions.

mod image;

pub use self::image::{ImageSource, ImageUrl, LoadState, LoadedImage, image_cost};
