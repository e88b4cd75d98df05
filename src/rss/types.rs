//! Type definitions for the RSS module.

use serde::{Deserialize, Serialize};

/// A single collected feed entry, as written to a run artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    /// RFC 3339 UTC, or empty when the feed gave no usable date.
    pub published: String,
    pub summary: String,
    /// Host of the feed the entry came from.
    pub source: String,
    pub fetched_at: String,
}

/// Raw response of a feed request, before decoding.
#[derive(Debug, Clone, Default)]
pub struct FetchedFeed {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
}

/// JSON feed structure for parsing
#[derive(Debug, Deserialize)]
pub struct JsonFeed {
    #[serde(default)]
    pub items: Vec<JsonFeedItem>,
}

/// JSON feed item structure
#[derive(Debug, Deserialize)]
pub struct JsonFeedItem {
    pub id: Option<String>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub content_text: Option<String>,
    pub content_html: Option<String>,
    pub date_published: Option<String>,
    pub date_modified: Option<String>,
}

// Constants
pub const USER_AGENT: &str = concat!("rss_collector/", env!("CARGO_PKG_VERSION"));
pub const ACCEPT_FEEDS: &str = "application/rss+xml, application/atom+xml, application/feed+json, application/xml, text/xml, */*;q=0.9";
