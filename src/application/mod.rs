//! Application layer wiring domain ports to infrastructure adapters.

/// Application services.
pub mod services;

pub use services::ImagePipeline;
