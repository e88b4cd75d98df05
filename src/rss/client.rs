//! HTTP client creation and request handling for RSS feeds.

use anyhow::{anyhow, Context, Result};
use reqwest::header;
use std::future::Future;
use tokio::time::{timeout, Duration};
use tracing::debug;

use super::types::{FetchedFeed, ACCEPT_FEEDS, USER_AGENT};
use crate::TARGET_WEB_REQUEST;

/// Source of raw feed documents.
///
/// The collector only depends on this trait, so a run can be driven by
/// something other than the network.
pub trait FeedFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchedFeed>>;
}

/// Create a client with the collector's identity and the given request timeout
pub fn create_http_client(request_timeout: Duration) -> Result<reqwest::Client> {
    debug!(target: TARGET_WEB_REQUEST, "Creating HTTP client with {:?} timeout", request_timeout);

    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .gzip(true)
        .timeout(request_timeout)
        .redirect(reqwest::redirect::Policy::default())
        .build()
        .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))
}

/// Fetches feeds over HTTP, one request per call, no retries.
pub struct HttpFetcher {
    client: reqwest::Client,
    request_timeout: Duration,
}

impl HttpFetcher {
    pub fn new(request_timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: create_http_client(request_timeout)?,
            request_timeout,
        })
    }
}

impl FeedFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedFeed> {
        debug!(target: TARGET_WEB_REQUEST, "Requesting {}", url);

        let response = match timeout(
            self.request_timeout,
            self.client
                .get(url)
                .header(header::ACCEPT, ACCEPT_FEEDS)
                .send(),
        )
        .await
        {
            Ok(Ok(resp)) => resp,
            Ok(Err(err)) => return Err(anyhow!("Request to {} failed: {}", url, err)),
            Err(_) => {
                return Err(anyhow!(
                    "Request to {} timed out after {} seconds",
                    url,
                    self.request_timeout.as_secs()
                ))
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Non-success status {} from {}", status, url));
        }

        debug!(target: TARGET_WEB_REQUEST, "Response Content-Type: {:?}",
               response.headers().get(header::CONTENT_TYPE));

        let content_type = header_value(&response, header::CONTENT_TYPE);
        let content_encoding = header_value(&response, header::CONTENT_ENCODING);

        let body = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read response body from {}", url))?;

        Ok(FetchedFeed {
            body: body.to_vec(),
            content_type,
            content_encoding,
        })
    }
}

fn header_value(response: &reqwest::Response, name: header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|s| s.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves `response` verbatim to the first connection and returns the URL.
    async fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        });
        format!("http://{}/rss", addr)
    }

    #[test]
    fn test_create_http_client() {
        assert!(create_http_client(Duration::from_secs(5)).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_an_error() {
        // Port 9 (discard) on localhost is closed on any sane test machine.
        let fetcher = HttpFetcher::new(Duration::from_secs(2)).unwrap();
        let result = fetcher.fetch("http://127.0.0.1:9/rss").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/rss", listener.local_addr().unwrap());
        tokio::spawn(async move {
            // Accept and hold the connection without ever answering
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let fetcher = HttpFetcher::new(Duration::from_secs(1)).unwrap();
        let started = Instant::now();
        let result = fetcher.fetch(&url).await;
        let elapsed = started.elapsed();

        assert!(result.is_err());
        assert!(elapsed >= Duration::from_millis(900), "returned after {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(3), "returned after {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_server_error_status_is_an_error() {
        let url = serve_once(
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;

        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();

        assert!(err.to_string().contains("500"), "unexpected error: {}", err);
    }

    #[tokio::test]
    async fn test_successful_fetch_keeps_body_and_content_type() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: application/RSS+xml; charset=utf-8\r\nContent-Length: 6\r\nConnection: close\r\n\r\n<rss/>",
        )
        .await;

        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
        let fetched = fetcher.fetch(&url).await.unwrap();

        assert_eq!(fetched.body, b"<rss/>");
        assert_eq!(
            fetched.content_type.as_deref(),
            Some("application/rss+xml; charset=utf-8")
        );
        assert_eq!(fetched.content_encoding, None);
    }
}
