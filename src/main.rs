use clap::Parser;
use color_eyre::eyre::{Result, bail};
use futures_util::future::join_all;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use pawprint::application::ImagePipeline;
use pawprint::domain::LoadState;
use pawprint::infrastructure::{AppConfig, CliArgs, StorageManager};
use pawprint::presentation::ImageView;

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = config.effective_log_path() {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let storage = StorageManager::new()?;
    let mut config = storage.load_config(args.config.as_deref())?;
    config.merge_with_args(args);
    Ok(config)
}

/// Formats the result line of one URL: `ok WxH cost source url` or
/// `failed attempts url`.
fn describe(url: &str, state: &LoadState) -> String {
    match state {
        LoadState::Succeeded(image) => format!(
            "ok {}x{} {} {} {url}",
            image.width(),
            image.height(),
            image.cost,
            image.source,
        ),
        LoadState::Failed { attempts } => format!("failed {attempts} {url}"),
        other => format!("unexpected {other:?} {url}"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = CliArgs::parse();
    let config = load_config(&args)?;
    init_logging(&config)?;

    info!(version = pawprint::VERSION, urls = args.urls.len(), "Starting pawprint");

    let pipeline = ImagePipeline::from_config(&config.images)?;
    let views: Vec<_> = args.urls.iter().map(|url| pipeline.view(url)).collect();
    join_all(views.iter().map(ImageView::wait)).await;

    let mut failures = 0;
    for view in &views {
        let state = view.state();
        if state.is_failed() {
            failures += 1;
        }
        println!("{}", describe(view.url(), &state));
    }
    println!("{}", pipeline.cache_stats());

    if failures > 0 {
        bail!("{failures} of {} images failed to load", views.len());
    }
    Ok(())
}
