use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info, warn};

use rss_collector::cleaner::Cleaner;
use rss_collector::config::{retention_from_days, CleanerConfig};
use rss_collector::logging::configure_logging;

/// Delete collector artifacts older than the retention window.
///
/// Every option falls back to its environment variable, then to the default
/// deployment under /opt/rss_collector.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding the artifacts [env: RSS_OUTPUT_DIR]
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Directory for the rolling log file [env: RSS_LOG_DIR]
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Maximum artifact age in days [env: RSS_RETENTION_DAYS]
    #[arg(long)]
    retention_days: Option<i64>,

    /// Only report what would be deleted
    #[arg(long)]
    dry_run: bool,
}

fn main() {
    let cli = Cli::parse();

    let mut config = match CleanerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Invalid configuration: {:#}", err);
            std::process::exit(2);
        }
    };
    if let Some(output_dir) = cli.output_dir {
        config.output_dir = output_dir;
    }
    if let Some(log_dir) = cli.log_dir {
        config.log_dir = log_dir;
    }
    if let Some(days) = cli.retention_days {
        config.retention = match retention_from_days(days) {
            Ok(retention) => retention,
            Err(err) => {
                eprintln!("Invalid configuration: {:#}", err);
                std::process::exit(2);
            }
        };
    }

    configure_logging(&config.log_dir, "clean_feeds.log");

    let cleaner = Cleaner::new(&config.output_dir, config.retention).dry_run(cli.dry_run);
    match cleaner.clean(Utc::now()) {
        Ok(report) => {
            info!(
                "Cleanup of {} completed: {} scanned, {} deleted, {} kept, {} failed",
                config.output_dir.display(),
                report.scanned,
                report.deleted.len(),
                report.kept,
                report.failed
            );
            if report.failed > 0 {
                warn!("{} files could not be deleted", report.failed);
            }
        }
        Err(err) => {
            error!("Cleanup failed: {:#}", err);
            std::process::exit(1);
        }
    }
}
