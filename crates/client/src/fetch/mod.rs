//! HTTP fetch pipeline used by install and the interception strategies.
//!
//! ### Network vs. HTTP failures
//! - A response with any status (including 4xx/5xx) is a successful fetch;
//!   callers decide what an error status means for them.
//! - Only transport failures (DNS, connect, reset, timeout, oversized body)
//!   are returned as errors, and those are what offline fallbacks key on.
//!
//! ### Cache bypass
//! - `CacheMode::Reload` sends `Cache-Control: no-cache` and `Pragma: no-cache`
//!   so intermediaries revalidate; install always fetches this way.

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;
use reqwest::{Client, Method, StatusCode, header};
use std::time::{Duration, Instant};

pub use self::url::{UrlError, canonicalize, resolve, same_origin};

use havn_core::{CachedResponse, Error};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "havn/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "havn/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&havn_core::AppConfig> for FetchConfig {
    fn from(config: &havn_core::AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// How a fetch interacts with HTTP caches between us and the origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheMode {
    #[default]
    Default,
    /// Force a fresh copy from the origin.
    Reload,
}

/// An outgoing request.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: String,
    pub url: Url,
    pub cache_mode: CacheMode,
}

impl FetchRequest {
    pub fn get(url: Url) -> Self {
        Self { method: "GET".into(), url, cache_mode: CacheMode::Default }
    }

    pub fn reload(url: Url) -> Self {
        Self { method: "GET".into(), url, cache_mode: CacheMode::Reload }
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The original URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body bytes
    pub bytes: Bytes,
    /// Response headers
    pub headers: header::HeaderMap,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

impl FetchResponse {
    /// Capture status, headers and body for storage or return to a caller.
    pub fn to_cached(&self) -> CachedResponse {
        let headers = self
            .headers
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned()))
            .collect();
        CachedResponse { status: self.status.as_u16(), headers, body: self.bytes.clone() }
    }
}

/// The network as seen by the cache manager.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Perform a request. Errors mean no response was obtained at all.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error>;
}

/// reqwest-backed fetcher.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    fn build(&self, request: &FetchRequest) -> Result<reqwest::RequestBuilder, Error> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| Error::InvalidInput(format!("invalid method: {}", request.method)))?;

        let mut builder = self.http.request(method, request.url.clone());
        if request.cache_mode == CacheMode::Reload {
            builder = builder
                .header(header::CACHE_CONTROL, "no-cache")
                .header(header::PRAGMA, "no-cache");
        }
        Ok(builder)
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl Fetcher for FetchClient {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        let start = Instant::now();

        let response = self.build(request)?.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::FetchTimeout(format!("{}: {}", request.url, e))
            } else {
                Error::Network(format!("{}: {}", request.url, e))
            }
        })?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response: {}", e)))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} {} -> {} {} in {}ms ({} bytes)",
            request.method,
            request.url,
            final_url,
            status.as_u16(),
            fetch_ms,
            bytes.len()
        );

        Ok(FetchResponse { url: request.url.clone(), final_url, status, content_type, bytes, headers, fetch_ms })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "havn/0.1");
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = havn_core::AppConfig { user_agent: "site/2".into(), timeout_ms: 1500, ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.user_agent, "site/2");
        assert_eq!(config.timeout, Duration::from_millis(1500));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_to_cached_captures_everything() {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("image/webp"));
        let response = FetchResponse {
            url: Url::parse("https://example.com/lib/icon_tab.webp").unwrap(),
            final_url: Url::parse("https://example.com/lib/icon_tab.webp").unwrap(),
            status: StatusCode::NOT_FOUND,
            content_type: Some("image/webp".to_string()),
            bytes: Bytes::from_static(b"RIFF"),
            headers,
            fetch_ms: 3,
        };

        let cached = response.to_cached();
        assert_eq!(cached.status, 404);
        assert_eq!(cached.header("content-type"), Some("image/webp"));
        assert_eq!(cached.body.as_ref(), b"RIFF");
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let client = FetchClient::new(FetchConfig::default());
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_reload_sets_no_cache_headers() {
        let client = FetchClient::new(FetchConfig::default()).unwrap();
        let url = Url::parse("https://example.com/offline.html").unwrap();

        let built = client.build(&FetchRequest::reload(url.clone())).unwrap().build().unwrap();
        assert_eq!(built.headers().get(header::CACHE_CONTROL).unwrap(), "no-cache");
        assert_eq!(built.headers().get(header::PRAGMA).unwrap(), "no-cache");

        let built = client.build(&FetchRequest::get(url)).unwrap().build().unwrap();
        assert!(built.headers().get(header::CACHE_CONTROL).is_none());
    }

    #[tokio::test]
    async fn test_invalid_method_rejected() {
        let client = FetchClient::new(FetchConfig::default()).unwrap();
        let request = FetchRequest {
            method: "BAD METHOD".into(),
            url: Url::parse("https://example.com").unwrap(),
            cache_mode: CacheMode::Default,
        };
        assert!(matches!(client.build(&request), Err(Error::InvalidInput(_))));
    }
}
