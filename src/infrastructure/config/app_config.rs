//! Application configuration.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::infrastructure::image::cms_cdn::DEFAULT_MAX_WIDTH;
use crate::infrastructure::image::loader::{
    DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_BACKOFF,
};
use crate::infrastructure::image::memory_cache::{DEFAULT_COST_LIMIT, DEFAULT_COUNT_LIMIT};
use crate::infrastructure::image::{CacheLimits, ImageLoaderConfig};

use super::args::CliArgs;

pub(super) const APP_NAME: &str = "pawprint";
pub(super) const APP_QUALIFIER: &str = "org";
pub(super) const APP_ORGANIZATION: &str = "pawprint";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Log file path.
    #[serde(default)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Image pipeline configuration.
    #[serde(default)]
    pub images: ImageConfig,
}

/// Image cache and loader configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Fetches per image before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Deadline of one fetch attempt, in seconds.
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,

    /// Flat delay between attempts, in milliseconds.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Maximum number of cached images.
    #[serde(default = "default_cache_count_limit")]
    pub cache_count_limit: usize,

    /// Maximum aggregate size of cached images, in bytes.
    #[serde(default = "default_cache_cost_limit_bytes")]
    pub cache_cost_limit_bytes: usize,

    /// Width requested from the CMS image CDN. 0 disables sizing.
    #[serde(default = "default_max_width")]
    pub max_width: u32,
}

impl ImageConfig {
    /// Returns the loader retry policy.
    #[must_use]
    pub const fn loader_config(&self) -> ImageLoaderConfig {
        ImageLoaderConfig {
            max_attempts: self.max_attempts,
            attempt_timeout: Duration::from_secs(self.attempt_timeout_secs),
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    /// Returns the cache bounds.
    #[must_use]
    pub const fn cache_limits(&self) -> CacheLimits {
        CacheLimits::new(self.cache_count_limit, self.cache_cost_limit_bytes)
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            attempt_timeout_secs: default_attempt_timeout_secs(),
            retry_backoff_ms: default_retry_backoff_ms(),
            cache_count_limit: default_cache_count_limit(),
            cache_cost_limit_bytes: default_cache_cost_limit_bytes(),
            max_width: default_max_width(),
        }
    }
}

const fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

const fn default_attempt_timeout_secs() -> u64 {
    DEFAULT_ATTEMPT_TIMEOUT.as_secs()
}

#[allow(clippy::cast_possible_truncation)]
const fn default_retry_backoff_ms() -> u64 {
    DEFAULT_RETRY_BACKOFF.as_millis() as u64
}

const fn default_cache_count_limit() -> usize {
    DEFAULT_COUNT_LIMIT
}

const fn default_cache_cost_limit_bytes() -> usize {
    DEFAULT_COST_LIMIT
}

const fn default_max_width() -> u32 {
    DEFAULT_MAX_WIDTH
}

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(max_attempts) = args.max_attempts {
            self.images.max_attempts = max_attempts;
        }
        if let Some(timeout) = args.attempt_timeout_secs {
            self.images.attempt_timeout_secs = timeout;
        }
        if let Some(backoff) = args.retry_backoff_ms {
            self.images.retry_backoff_ms = backoff;
        }
        if let Some(count) = args.cache_count_limit {
            self.images.cache_count_limit = count;
        }
        if let Some(cost) = args.cache_cost_limit_bytes {
            self.images.cache_cost_limit_bytes = cost;
        }
        if let Some(max_width) = args.max_width {
            self.images.max_width = max_width;
        }
    }

    /// Returns default log file path.
    #[must_use]
    pub fn default_log_path() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.data_dir().join("pawprint.log"))
    }

    /// Returns effective log path.
    #[must_use]
    pub fn effective_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone().or_else(Self::default_log_path)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_path: None,
            log_level: LogLevel::Info,
            images: ImageConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_partial_images_table() {
        let toml_content = r#"
            log_level = "debug"

            [images]
            max_attempts = 5
            retry_backoff_ms = 250
        "#;

        let config: AppConfig = toml::from_str(toml_content).expect("Failed to parse config");

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.images.max_attempts, 5);
        assert_eq!(config.images.retry_backoff_ms, 250);
        assert_eq!(config.images.attempt_timeout_secs, 10);
        assert_eq!(config.images.cache_count_limit, 100);
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        let loader = config.images.loader_config();
        let limits = config.images.cache_limits();

        assert_eq!(loader.max_attempts, 3);
        assert_eq!(loader.attempt_timeout, Duration::from_secs(10));
        assert_eq!(loader.retry_backoff, Duration::from_secs(1));
        assert_eq!(limits.max_entries, 100);
        assert_eq!(limits.max_cost, 100 * 1024 * 1024);
    }

    #[test]
    fn test_empty_file_is_default() {
        let config: AppConfig = toml::from_str("").expect("empty config");
        assert_eq!(config.images, ImageConfig::default());
    }

    #[test]
    fn test_merge_with_args_overrides() {
        let mut config = AppConfig::default();
        let args = CliArgs::parse_from([
            "pawprint",
            "--max-attempts",
            "7",
            "--retry-backoff-ms",
            "0",
            "--log-level",
            "trace",
            "https://example.com/a.png",
        ]);

        config.merge_with_args(&args);

        assert_eq!(config.images.max_attempts, 7);
        assert_eq!(config.images.retry_backoff_ms, 0);
        assert_eq!(config.log_level, LogLevel::Trace);
        assert_eq!(config.images.attempt_timeout_secs, 10);
    }

    #[test]
    fn test_config_path_only_selects_the_file() {
        let mut config = AppConfig::default();
        let args = CliArgs::parse_from([
            "pawprint",
            "--config",
            "/tmp/pawprint-custom.toml",
            "https://example.com/a.png",
        ]);

        config.merge_with_args(&args);

        assert_eq!(config.images, ImageConfig::default());
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(config.log_path.is_none());
        let saved = toml::to_string(&config).expect("serialize config");
        assert!(!saved.lines().any(|line| line.starts_with("config")));
    }
}
