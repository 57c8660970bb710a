//! Pawprint - image cache and loader of the pet-adoption client.
//!
//! Animal photos and article illustrations are fetched over HTTPS, decoded,
//! kept in a cache bounded by entry count and byte cost, and handed to views
//! through a per-request loader with a timeout and a flat retry budget.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer wiring the pipeline together.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing the cache, fetcher, loader and config.
pub mod infrastructure;
/// Presentation layer containing view models.
pub mod presentation;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "pawprint";
