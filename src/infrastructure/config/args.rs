use super::app_config::LogLevel;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "pawprint",
    version,
    about = "Load images through the bounded cache and retrying loader",
    long_about = None
)]
pub struct CliArgs {
    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Fetches per image before giving up.
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Deadline of one fetch attempt, in seconds.
    #[arg(long)]
    pub attempt_timeout_secs: Option<u64>,

    /// Delay between attempts, in milliseconds.
    #[arg(long)]
    pub retry_backoff_ms: Option<u64>,

    /// Maximum number of cached images.
    #[arg(long)]
    pub cache_count_limit: Option<usize>,

    /// Maximum aggregate size of cached images, in bytes.
    #[arg(long)]
    pub cache_cost_limit_bytes: Option<usize>,

    /// Width requested from the CMS image CDN (0 disables sizing).
    #[arg(long)]
    pub max_width: Option<u32>,

    /// Image URLs to load.
    #[arg(value_name = "URL", required = true)]
    pub urls: Vec<String>,
}
