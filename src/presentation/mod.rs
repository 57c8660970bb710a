//! Presentation layer: view models for image-bearing views.

/// Reusable view components.
pub mod widgets;

pub use widgets::{ImageDisplay, ImageView};
