use std::io;
use std::path::Path;
use tracing::warn;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "info,hyper=warn,reqwest=warn";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber: stdout plus a daily-rolling file named
/// `file_name` under `log_dir`.
///
/// When the log directory cannot be used the job still runs with stdout
/// logging only, so cron mail picks up the output.
pub fn configure_logging(log_dir: &Path, file_name: &str) {
    // Stdout log configuration
    let stdout_log = fmt::layer().with_writer(io::stdout).with_filter(env_filter());

    // File log configuration
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(file_name)
        .build(log_dir);

    let (file_log, appender_error) = match file_appender {
        Ok(appender) => (
            Some(
                fmt::layer()
                    .with_writer(appender)
                    .with_ansi(false)
                    .with_filter(env_filter()),
            ),
            None,
        ),
        Err(err) => (None, Some(err)),
    };

    tracing_subscriber::Registry::default()
        .with(stdout_log)
        .with(file_log)
        .init();

    if let Some(err) = appender_error {
        warn!(
            "Unable to log to {}: {}; logging to stdout only",
            log_dir.display(),
            err
        );
    }
}
