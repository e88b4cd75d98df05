//! The collection run: fetch every configured feed once, in order, and write
//! everything collected to a single run artifact.

use anyhow::Result;
use chrono::Utc;
use std::path::PathBuf;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::artifact::write_artifact;
use crate::rss::{decode_body, is_valid_url, parse_feed, FeedEntry, FeedFetcher};
use crate::TARGET_WEB_REQUEST;

/// Outcome of collecting all feeds for one run.
#[derive(Debug, Default)]
pub struct CollectionReport {
    pub entries: Vec<FeedEntry>,
    pub succeeded: Vec<String>,
    /// Feeds that were skipped, with the reason.
    pub failed: Vec<(String, String)>,
}

pub struct Collector<F> {
    feed_urls: Vec<String>,
    output_dir: PathBuf,
    politeness_delay: Duration,
    fetcher: F,
}

impl<F: FeedFetcher> Collector<F> {
    pub fn new(feed_urls: Vec<String>, output_dir: impl Into<PathBuf>, fetcher: F) -> Self {
        Self {
            feed_urls,
            output_dir: output_dir.into(),
            politeness_delay: Duration::ZERO,
            fetcher,
        }
    }

    /// Pause between consecutive feed requests.
    pub fn with_politeness_delay(mut self, delay: Duration) -> Self {
        self.politeness_delay = delay;
        self
    }

    /// Fetches and parses every configured feed. A failing feed is logged and
    /// skipped; it never stops the remaining feeds from being collected.
    pub async fn collect_all_feeds(&self) -> CollectionReport {
        let mut report = CollectionReport::default();
        let mut first_request = true;

        for rss_url in &self.feed_urls {
            let rss_url = rss_url.trim();
            if rss_url.is_empty() {
                debug!(target: TARGET_WEB_REQUEST, "Skipping empty RSS URL");
                continue;
            }

            if !is_valid_url(rss_url) {
                warn!(target: TARGET_WEB_REQUEST, "Skipping invalid URL: {}", rss_url);
                report
                    .failed
                    .push((rss_url.to_string(), "invalid URL".to_string()));
                continue;
            }

            if !first_request && !self.politeness_delay.is_zero() {
                sleep(self.politeness_delay).await;
            }
            first_request = false;

            info!(target: TARGET_WEB_REQUEST, "Fetching feed from: {}", rss_url);
            match self.collect_feed(rss_url).await {
                Ok(entries) => {
                    info!(target: TARGET_WEB_REQUEST, "Collected {} entries from {}", entries.len(), rss_url);
                    report.entries.extend(entries);
                    report.succeeded.push(rss_url.to_string());
                }
                Err(err) => {
                    warn!(target: TARGET_WEB_REQUEST, "Skipping feed {}: {:#}", rss_url, err);
                    report.failed.push((rss_url.to_string(), format!("{:#}", err)));
                }
            }
        }

        info!(
            target: TARGET_WEB_REQUEST,
            "Total entries collected: {} ({} feeds succeeded, {} failed)",
            report.entries.len(),
            report.succeeded.len(),
            report.failed.len()
        );
        report
    }

    async fn collect_feed(&self, rss_url: &str) -> Result<Vec<FeedEntry>> {
        let fetched = self.fetcher.fetch(rss_url).await?;
        let text = decode_body(
            &fetched.body,
            fetched.content_type.as_deref(),
            fetched.content_encoding.as_deref(),
            rss_url,
        );
        parse_feed(&text, fetched.content_type.as_deref(), rss_url, Utc::now())
    }

    /// Runs one collection end to end and returns the artifact written.
    ///
    /// An artifact is written even when nothing was collected, so every run
    /// leaves exactly one file behind. Failing to write it is an error.
    pub async fn run(&self) -> Result<PathBuf> {
        let start_time = Instant::now();
        let collected_at = Utc::now();
        info!("Starting RSS feed collection for {} feeds", self.feed_urls.len());

        let report = self.collect_all_feeds().await;
        for (url, reason) in &report.failed {
            debug!(target: TARGET_WEB_REQUEST, "Failed feed {}: {}", url, reason);
        }

        let path = write_artifact(&self.output_dir, collected_at, &report.entries)?;

        info!(
            "RSS feed collection finished in {:.2} seconds",
            start_time.elapsed().as_secs_f64()
        );
        Ok(path)
    }
}
