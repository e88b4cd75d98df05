//! Feed parsing logic for RSS, Atom, and JSON formats.

use anyhow::{anyhow, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use feed_rs::parser;
use std::io::Cursor;
use tracing::{debug, warn};

use super::types::{FeedEntry, JsonFeed, JsonFeedItem};
use super::util::{cleanup_xml, parse_date, source_from_url};
use crate::TARGET_WEB_REQUEST;

fn format_date(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a decoded feed document into entries.
///
/// JSON Feed is used when the content type says so; everything else goes
/// through `feed-rs`, with a second attempt on cleaned-up XML when the first
/// parse fails.
pub fn parse_feed(
    text: &str,
    content_type: Option<&str>,
    rss_url: &str,
    fetched_at: DateTime<Utc>,
) -> Result<Vec<FeedEntry>> {
    let source = source_from_url(rss_url);
    let fetched_at = format_date(fetched_at);

    if let Some(ct) = content_type {
        if ct.contains("json") {
            debug!(target: TARGET_WEB_REQUEST, "Processing as JSON feed: {}", rss_url);
            let feed: JsonFeed = serde_json::from_str(text)
                .map_err(|err| anyhow!("Failed to parse JSON feed from {}: {}", rss_url, err))?;
            return Ok(feed
                .items
                .into_iter()
                .map(|item| entry_from_json_item(item, &source, &fetched_at))
                .collect());
        }
    }

    debug!(target: TARGET_WEB_REQUEST, "Processing as XML feed: {}", rss_url);
    let feed_parser = parser::Builder::new().timestamp_parser(parse_date).build();
    let feed = match feed_parser.parse(Cursor::new(text)) {
        Ok(feed) => feed,
        Err(first_err) => {
            let cleaned_xml = cleanup_xml(text);

            if !(cleaned_xml.contains("<rss") || cleaned_xml.contains("<feed")) {
                let preview = if text
                    .chars()
                    .all(|c| c.is_ascii_graphic() || c.is_whitespace())
                {
                    text.chars().take(100).collect::<String>()
                } else {
                    "[binary data]".to_string()
                };
                return Err(anyhow!(
                    "Feed from {} doesn't appear to be RSS or Atom. Content preview: {}",
                    rss_url,
                    preview
                ));
            }

            match feed_parser.parse(Cursor::new(cleaned_xml)) {
                Ok(feed) => {
                    warn!(target: TARGET_WEB_REQUEST, "Feed at {} has issues, parsed after XML cleanup: {}", rss_url, first_err);
                    feed
                }
                Err(second_err) => {
                    return Err(anyhow!(
                        "Failed to parse feed from {} after cleanup. First error: {}. Second error: {}",
                        rss_url,
                        first_err,
                        second_err
                    ));
                }
            }
        }
    };

    debug!(target: TARGET_WEB_REQUEST, "Parsed feed with {} entries", feed.entries.len());

    Ok(feed
        .entries
        .into_iter()
        .map(|entry| entry_from_feed_rs(entry, &source, &fetched_at))
        .collect())
}

fn entry_from_feed_rs(entry: feed_rs::model::Entry, source: &str, fetched_at: &str) -> FeedEntry {
    let summary = entry
        .summary
        .map(|text| text.content)
        .or_else(|| entry.content.and_then(|content| content.body))
        .unwrap_or_default();

    FeedEntry {
        title: entry.title.map(|t| t.content).unwrap_or_default(),
        link: entry
            .links
            .first()
            .map(|link| link.href.clone())
            .unwrap_or_default(),
        published: entry
            .published
            .or(entry.updated)
            .map(format_date)
            .unwrap_or_default(),
        summary,
        source: source.to_string(),
        fetched_at: fetched_at.to_string(),
    }
}

fn entry_from_json_item(item: JsonFeedItem, source: &str, fetched_at: &str) -> FeedEntry {
    let published = item
        .date_published
        .or(item.date_modified)
        .map(|d| parse_date(&d).map(format_date).unwrap_or_default())
        .unwrap_or_default();

    FeedEntry {
        title: item.title.unwrap_or_default(),
        link: item.url.or(item.id).unwrap_or_default(),
        published,
        summary: item
            .summary
            .or(item.content_text)
            .or(item.content_html)
            .unwrap_or_default(),
        source: source.to_string(),
        fetched_at: fetched_at.to_string(),
    }
}
