//! Application services.

mod image_pipeline;

pub use image_pipeline::ImagePipeline;
