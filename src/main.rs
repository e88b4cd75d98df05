use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

use rss_collector::collector::Collector;
use rss_collector::config::CollectorConfig;
use rss_collector::logging::configure_logging;
use rss_collector::rss::HttpFetcher;

/// Fetch the configured RSS feeds once and save the entries as a JSON artifact.
///
/// Every option falls back to its environment variable, then to the default
/// deployment under /opt/rss_collector.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// File listing one feed URL per line [env: RSS_SOURCES_FILE]
    #[arg(long)]
    sources_file: Option<PathBuf>,

    /// Directory receiving the run artifact [env: RSS_OUTPUT_DIR]
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Directory for the rolling log file [env: RSS_LOG_DIR]
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Per-request timeout in seconds [env: RSS_REQUEST_TIMEOUT_SECS]
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Pause between feeds in milliseconds [env: RSS_POLITENESS_DELAY_MS]
    #[arg(long)]
    delay_ms: Option<u64>,
}

impl Cli {
    fn apply(self, config: &mut CollectorConfig) {
        if let Some(sources_file) = self.sources_file {
            config.sources_file = sources_file;
            // An explicit file wins over RSS_FEEDS
            config.inline_feeds.clear();
        }
        if let Some(output_dir) = self.output_dir {
            config.output_dir = output_dir;
        }
        if let Some(log_dir) = self.log_dir {
            config.log_dir = log_dir;
        }
        if let Some(secs) = self.timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = self.delay_ms {
            config.politeness_delay = Duration::from_millis(ms);
        }
    }
}

async fn run(config: CollectorConfig) -> Result<()> {
    let feed_urls = config.feed_urls()?;
    info!("Loaded {} feed URLs", feed_urls.len());

    let fetcher = HttpFetcher::new(config.request_timeout)
        .context("Failed to initialize HTTP client")?;
    Collector::new(feed_urls, &config.output_dir, fetcher)
        .with_politeness_delay(config.politeness_delay)
        .run()
        .await?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let mut config = match CollectorConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Invalid configuration: {:#}", err);
            std::process::exit(2);
        }
    };
    cli.apply(&mut config);

    configure_logging(&config.log_dir, "rss_collector.log");

    if let Err(err) = run(config).await {
        error!("RSS feed collection failed: {:#}", err);
        std::process::exit(1);
    }
}
