//! Utility functions for RSS feed processing.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::io::Read;
use tracing::debug;

use crate::TARGET_WEB_REQUEST;

/// Helper function to validate a URL
pub fn is_valid_url(url: &str) -> bool {
    if let Ok(parsed) = url::Url::parse(url) {
        parsed.scheme() == "http" || parsed.scheme() == "https"
    } else {
        false
    }
}

/// Host name of a feed URL, used to tag entries with where they came from.
pub fn source_from_url(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Timezone abbreviations seen in European feeds that RFC 2822 parsing rejects.
const TZ_ABBREVIATIONS: &[(&str, &str)] = &[(" CEST", " +0200"), (" CET", " +0100")];

/// Parse a date string in various formats
pub fn parse_date(date_str: &str) -> Option<DateTime<Utc>> {
    let date_str = date_str.trim();
    if date_str.is_empty() {
        return None;
    }

    // Try RFC3339
    if let Ok(date) = DateTime::parse_from_rfc3339(date_str) {
        return Some(date.with_timezone(&Utc));
    }

    // Rewrite zone names chrono would otherwise read as UTC
    for (abbreviation, offset) in TZ_ABBREVIATIONS {
        if let Some(prefix) = date_str.strip_suffix(abbreviation) {
            if let Some(date) = parse_rfc2822_lenient(&format!("{}{}", prefix, offset)) {
                return Some(date);
            }
        }
    }

    // Try RFC2822
    if let Some(date) = parse_rfc2822_lenient(date_str) {
        return Some(date);
    }

    // Try ISO 8601 with a numeric offset
    if let Ok(date) = DateTime::parse_from_str(date_str, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(date.with_timezone(&Utc));
    }

    // Common formats without an offset are taken as UTC
    for format in &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d/%m/%Y %H:%M:%S"] {
        if let Ok(date) = NaiveDateTime::parse_from_str(date_str, format) {
            return Some(date.and_utc());
        }
    }
    for format in &["%Y-%m-%d", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(date_str, format) {
            return date.and_hms_opt(0, 0, 0).map(|d| d.and_utc());
        }
    }

    None
}

/// RFC 2822, retried without the day name since feeds often get it wrong.
fn parse_rfc2822_lenient(date_str: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc2822(date_str) {
        return Some(date.with_timezone(&Utc));
    }
    let (_, without_weekday) = date_str.split_once(", ")?;
    DateTime::parse_from_rfc2822(without_weekday.trim())
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

/// Clean up malformed XML
pub fn cleanup_xml(xml: &str) -> String {
    let mut cleaned = xml.trim();

    // Remove any UTF-8 BOM if present
    if let Some(stripped) = cleaned.strip_prefix('\u{FEFF}') {
        cleaned = stripped;
    }

    // Remove any leading garbage before <?xml, <rss or <feed
    if let Some(xml_start) = cleaned.find("<?xml") {
        cleaned = &cleaned[xml_start..];
    } else if let Some(rss_start) = cleaned.find("<rss") {
        cleaned = &cleaned[rss_start..];
    } else if let Some(feed_start) = cleaned.find("<feed") {
        cleaned = &cleaned[feed_start..];
    }

    // Replace common HTML entities that XML does not define
    let mut cleaned = cleaned
        .replace("&nbsp;", "&#160;")
        .replace("&ndash;", "&#8211;")
        .replace("&mdash;", "&#8212;")
        .replace("&rsquo;", "&#8217;")
        .replace("&lsquo;", "&#8216;")
        .replace("&rdquo;", "&#8221;")
        .replace("&ldquo;", "&#8220;")
        .replace("&amp;amp;", "&amp;")
        .replace("&apos;", "&#39;");

    // Remove any invalid XML characters
    cleaned = cleaned
        .chars()
        .filter(|&c| {
            matches!(c,
                '\u{0009}' | // tab
                '\u{000A}' | // newline
                '\u{000D}' | // carriage return
                '\u{0020}'..='\u{D7FF}' |
                '\u{E000}'..='\u{FFFD}' |
                '\u{10000}'..='\u{10FFFF}'
            )
        })
        .collect();

    // Ensure proper XML declaration if missing
    if !cleaned.starts_with("<?xml") {
        cleaned = format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}", cleaned);
    }

    cleaned
}

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Undo transfer compression the HTTP client did not already strip.
///
/// Brotli and raw deflate are only attempted when the server announced them,
/// since neither has a reliable signature; gzip and zlib are sniffed.
pub fn try_decompressions(bytes: &[u8], content_encoding: Option<&str>, rss_url: &str) -> Vec<u8> {
    match content_encoding {
        Some("br") => {
            let mut decoded = Vec::new();
            let mut reader = brotli::Decompressor::new(bytes, 4096);
            if reader.read_to_end(&mut decoded).is_ok() && !decoded.is_empty() {
                debug!(target: TARGET_WEB_REQUEST, "Successfully decompressed brotli content from {}", rss_url);
                return decoded;
            }
            debug!(target: TARGET_WEB_REQUEST, "Brotli decompression failed for {}, trying other methods", rss_url);
        }
        Some("deflate") => {
            let mut decoded = Vec::new();
            if flate2::read::DeflateDecoder::new(bytes)
                .read_to_end(&mut decoded)
                .is_ok()
                && !decoded.is_empty()
            {
                debug!(target: TARGET_WEB_REQUEST, "Successfully decompressed with deflate from {}", rss_url);
                return decoded;
            }
        }
        _ => {}
    }

    // Gzip
    if bytes.starts_with(&GZIP_MAGIC) {
        let mut decoded = Vec::new();
        if flate2::read::GzDecoder::new(bytes)
            .read_to_end(&mut decoded)
            .is_ok()
            && !decoded.is_empty()
        {
            debug!(target: TARGET_WEB_REQUEST, "Successfully decompressed with gzip from {}", rss_url);
            return decoded;
        }
    }

    // Zlib
    if bytes.first() == Some(&0x78) {
        let mut decoded = Vec::new();
        if flate2::read::ZlibDecoder::new(bytes)
            .read_to_end(&mut decoded)
            .is_ok()
            && !decoded.is_empty()
        {
            debug!(target: TARGET_WEB_REQUEST, "Successfully decompressed with zlib from {}", rss_url);
            return decoded;
        }
    }

    bytes.to_vec()
}

/// Charset parameter of a Content-Type header, if any.
pub fn charset_from_content_type(content_type: &str) -> Option<&str> {
    content_type
        .split(';')
        .map(str::trim)
        .find(|part| part.to_lowercase().starts_with("charset="))
        .and_then(|charset| charset.split('=').nth(1))
        .map(|charset| charset.trim().trim_matches('"'))
}

/// Turn a response body into text: UTF-8 when valid, otherwise the declared
/// charset, otherwise windows-1252.
pub fn decode_body(
    bytes: &[u8],
    content_type: Option<&str>,
    content_encoding: Option<&str>,
    rss_url: &str,
) -> String {
    let decompressed = try_decompressions(bytes, content_encoding, rss_url);

    let decompressed = match String::from_utf8(decompressed) {
        Ok(text) => return text,
        Err(err) => err.into_bytes(),
    };

    if let Some(charset) = content_type.and_then(charset_from_content_type) {
        if let Some(encoding) = encoding_rs::Encoding::for_label(charset.as_bytes()) {
            debug!(target: TARGET_WEB_REQUEST, "Decoding {} as {}", rss_url, encoding.name());
            let (decoded, _, _) = encoding.decode(&decompressed);
            return decoded.into_owned();
        }
        debug!(target: TARGET_WEB_REQUEST, "Unsupported charset {} from {}", charset, rss_url);
    }

    debug!(target: TARGET_WEB_REQUEST, "Falling back to windows-1252 for {}", rss_url);
    let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&decompressed);
    decoded.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_is_valid_url() {
        assert!(is_valid_url("http://a/rss"));
        assert!(is_valid_url("https://example.com/feed.xml"));
        assert!(!is_valid_url("ftp://example.com/feed.xml"));
        assert!(!is_valid_url("not a url"));
    }

    #[test]
    fn test_source_from_url() {
        assert_eq!(source_from_url("https://news.example.com/rss"), "news.example.com");
        assert_eq!(source_from_url("garbage"), "unknown");
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = Utc.with_ymd_and_hms(2026, 10, 12, 8, 0, 0).unwrap();
        assert_eq!(parse_date("2026-10-12T08:00:00Z"), Some(expected));
        assert_eq!(parse_date("2026-10-12T10:00:00+02:00"), Some(expected));
        assert_eq!(parse_date("Mon, 12 Oct 2026 08:00:00 GMT"), Some(expected));
        assert_eq!(parse_date("Mon, 12 Oct 2026 10:00:00 CEST"), Some(expected));
        assert_eq!(parse_date("Mon, 12 Oct 2026 09:00:00 CET"), Some(expected));
        assert_eq!(parse_date("2026-10-12 08:00:00"), Some(expected));
        assert_eq!(
            parse_date("2026-10-12"),
            Some(Utc.with_ymd_and_hms(2026, 10, 12, 0, 0, 0).unwrap())
        );
        // Wrong day name, 12 Oct 2026 is a Monday
        assert_eq!(parse_date("Tue, 12 Oct 2026 08:00:00 GMT"), Some(expected));
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_cleanup_xml() {
        let dirty = "\u{FEFF}  junk before <rss version=\"2.0\"><channel><title>A&nbsp;B</title></channel></rss>";
        let cleaned = cleanup_xml(dirty);
        assert!(cleaned.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss"));
        assert!(cleaned.contains("A&#160;B"));
        assert!(!cleaned.contains("junk"));
    }

    #[test]
    fn test_decode_body_gzip() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"<rss version=\"2.0\"></rss>").unwrap();
        let compressed = encoder.finish().unwrap();

        let text = decode_body(&compressed, Some("application/rss+xml"), None, "http://a/rss");
        assert_eq!(text, "<rss version=\"2.0\"></rss>");
    }

    #[test]
    fn test_decode_body_plain_passes_through() {
        let text = decode_body(b"<feed></feed>", None, None, "http://a/rss");
        assert_eq!(text, "<feed></feed>");
    }

    #[test]
    fn test_decode_body_declared_charset() {
        // "café" in latin-1
        let bytes = [b'c', b'a', b'f', 0xE9];
        let text = decode_body(&bytes, Some("text/xml; charset=ISO-8859-1"), None, "http://a/rss");
        assert_eq!(text, "café");

        let text = decode_body(&bytes, None, None, "http://a/rss");
        assert_eq!(text, "café");
    }

    #[test]
    fn test_charset_from_content_type() {
        assert_eq!(
            charset_from_content_type("text/xml; charset=\"utf-8\""),
            Some("utf-8")
        );
        assert_eq!(charset_from_content_type("application/rss+xml"), None);
    }
}
