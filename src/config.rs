//! Runtime configuration for the collector and cleaner jobs.
//!
//! Both jobs are configured from the environment with defaults suitable for a
//! cron deployment under `/opt/rss_collector`; the binaries then apply any
//! command line overrides on top.

use anyhow::{Context, Result};
use chrono::Duration as ChronoDuration;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::environment::{get_env_var_as_path, get_env_var_as_vec, get_env_var_parsed};

pub const DEFAULT_SOURCES_FILE: &str = "/opt/rss_collector/rss_sources.txt";
pub const DEFAULT_OUTPUT_DIR: &str = "/opt/rss_collector/rss_feeds";
pub const DEFAULT_LOG_DIR: &str = "/opt/rss_collector";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_POLITENESS_DELAY_MS: u64 = 1000;
pub const DEFAULT_RETENTION_DAYS: i64 = 10;

pub const ENV_SOURCES_FILE: &str = "RSS_SOURCES_FILE";
pub const ENV_FEEDS: &str = "RSS_FEEDS";
pub const ENV_OUTPUT_DIR: &str = "RSS_OUTPUT_DIR";
pub const ENV_LOG_DIR: &str = "RSS_LOG_DIR";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "RSS_REQUEST_TIMEOUT_SECS";
pub const ENV_POLITENESS_DELAY_MS: &str = "RSS_POLITENESS_DELAY_MS";
pub const ENV_RETENTION_DAYS: &str = "RSS_RETENTION_DAYS";

#[derive(Clone, Debug)]
pub struct CollectorConfig {
    pub sources_file: PathBuf,
    /// Feeds given inline via `RSS_FEEDS`; when non-empty the sources file is not read.
    pub inline_feeds: Vec<String>,
    pub output_dir: PathBuf,
    pub log_dir: PathBuf,
    pub request_timeout: Duration,
    pub politeness_delay: Duration,
}

impl CollectorConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            sources_file: get_env_var_as_path(ENV_SOURCES_FILE, DEFAULT_SOURCES_FILE),
            inline_feeds: get_env_var_as_vec(ENV_FEEDS, ';'),
            output_dir: get_env_var_as_path(ENV_OUTPUT_DIR, DEFAULT_OUTPUT_DIR),
            log_dir: get_env_var_as_path(ENV_LOG_DIR, DEFAULT_LOG_DIR),
            request_timeout: Duration::from_secs(get_env_var_parsed(
                ENV_REQUEST_TIMEOUT_SECS,
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
            politeness_delay: Duration::from_millis(get_env_var_parsed(
                ENV_POLITENESS_DELAY_MS,
                DEFAULT_POLITENESS_DELAY_MS,
            )?),
        })
    }

    /// Resolves the list of feed URLs to collect, in configured order.
    pub fn feed_urls(&self) -> Result<Vec<String>> {
        if !self.inline_feeds.is_empty() {
            return Ok(self.inline_feeds.clone());
        }
        load_feed_urls(&self.sources_file)
    }
}

#[derive(Clone, Debug)]
pub struct CleanerConfig {
    pub output_dir: PathBuf,
    pub log_dir: PathBuf,
    pub retention: ChronoDuration,
}

impl CleanerConfig {
    pub fn from_env() -> Result<Self> {
        let retention_days: i64 = get_env_var_parsed(ENV_RETENTION_DAYS, DEFAULT_RETENTION_DAYS)?;
        Ok(Self {
            output_dir: get_env_var_as_path(ENV_OUTPUT_DIR, DEFAULT_OUTPUT_DIR),
            log_dir: get_env_var_as_path(ENV_LOG_DIR, DEFAULT_LOG_DIR),
            retention: retention_from_days(retention_days)?,
        })
    }
}

pub fn retention_from_days(days: i64) -> Result<ChronoDuration> {
    if days < 0 {
        anyhow::bail!("Retention must not be negative, got {} days", days);
    }
    ChronoDuration::try_days(days)
        .with_context(|| format!("Retention of {} days is out of range", days))
}

/// Reads a sources file: one URL per line, blank lines and `#` comments ignored.
pub fn load_feed_urls(path: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read sources file {}", path.display()))?;
    Ok(parse_feed_urls(&contents))
}

pub fn parse_feed_urls(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
