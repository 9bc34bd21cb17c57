//! sw_fetch tool implementation.
//!
//! Runs one request through the interceptor exactly as the host would and
//! reports what it decided. Passthrough requests are then fetched directly
//! from the network, bypassing the cache, as the host's default path does.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use havn_client::{CacheManager, Interception, RequestDescriptor, WorkerHooks};
use havn_core::{CachedResponse, Error};

use super::json_result;

/// Input parameters for sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL, or a path relative to the site origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Treat the request as a top-level document navigation.
    #[serde(default)]
    pub navigate: bool,
}

fn default_method() -> String {
    "GET".into()
}

/// A response as returned to the tool caller.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResponseOutput {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    /// Body as text, absent when it is not valid UTF-8.
    pub body: Option<String>,
    pub body_bytes: usize,
}

impl From<CachedResponse> for ResponseOutput {
    fn from(response: CachedResponse) -> Self {
        let body_bytes = response.body.len();
        let body = String::from_utf8(response.body.to_vec()).ok();
        Self { status: response.status, headers: response.headers, body, body_bytes }
    }
}

/// Output structure for sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    /// "respond" or "passthrough".
    pub outcome: String,
    /// "network", "cache" or "fallback". Passthrough responses are always
    /// "network"; absent when a passthrough URL cannot be fetched (e.g. a
    /// non-http scheme).
    pub source: Option<String>,
    pub response: Option<ResponseOutput>,
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(manager: &CacheManager, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let request = RequestDescriptor { method: params.method, url: params.url, navigate: params.navigate };
    let output = match manager.on_intercept(request.clone()).await? {
        Interception::Passthrough => {
            let response: Option<ResponseOutput> = match manager.fetch_uncached(&request).await {
                Ok(response) => Some(response.into()),
                Err(Error::InvalidUrl(reason)) => {
                    tracing::debug!(url = %request.url, "passthrough not fetchable: {reason}");
                    None
                }
                Err(e) => return Err(e.into()),
            };
            let source = response.as_ref().map(|_| "network".to_string());
            SwFetchOutput { outcome: "passthrough".into(), source, response }
        }
        Interception::Respond(served) => SwFetchOutput {
            outcome: "respond".into(),
            source: serde_json::to_value(served.source).ok().and_then(|v| v.as_str().map(str::to_string)),
            response: Some(served.response.into()),
        },
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{FixedNetwork, manager, text};
    use havn_core::{CacheDb, CacheStore};

    fn params(url: &str, navigate: bool) -> SwFetchParams {
        SwFetchParams { url: url.into(), method: default_method(), navigate }
    }

    #[tokio::test]
    async fn test_fetch_navigation_offline_serves_fallback() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let online = manager(&db, "offline-v3", FixedNetwork::site()).await;
        online.install().await.unwrap();

        let offline = manager(&db, "offline-v3", FixedNetwork::default()).await;
        let result = fetch_impl(&offline, params("/blog/post", true)).await.unwrap();
        let output: SwFetchOutput = serde_json::from_str(&text(&result)).unwrap();

        assert_eq!(output.outcome, "respond");
        assert_eq!(output.source.as_deref(), Some("fallback"));
        let response = output.response.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body.as_deref(), Some("<h1>offline</h1>"));
    }

    #[tokio::test]
    async fn test_fetch_cross_origin_passes_through_to_network() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let mut network = FixedNetwork::site();
        network.routes.insert("https://formspree.io/f/abc".to_string(), (202, "queued"));
        let manager = manager(&db, "offline-v3", network).await;

        let result = fetch_impl(&manager, params("https://formspree.io/f/abc", false)).await.unwrap();
        let output: SwFetchOutput = serde_json::from_str(&text(&result)).unwrap();

        assert_eq!(output.outcome, "passthrough");
        assert_eq!(output.source.as_deref(), Some("network"));
        let response = output.response.unwrap();
        assert_eq!(response.status, 202);
        assert_eq!(response.body.as_deref(), Some("queued"));
        assert!(db.list_versions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_passthrough_network_failure_is_error() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let manager = manager(&db, "offline-v3", FixedNetwork::site()).await;

        let err = fetch_impl(&manager, params("/script.js", false)).await.unwrap_err();
        assert_eq!(err.code.0, -32008);
    }

    #[tokio::test]
    async fn test_fetch_unfetchable_passthrough_has_no_response() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let manager = manager(&db, "offline-v3", FixedNetwork::site()).await;

        let result = fetch_impl(&manager, params("mailto:someone@example.com", false)).await.unwrap();
        let output: SwFetchOutput = serde_json::from_str(&text(&result)).unwrap();

        assert_eq!(output.outcome, "passthrough");
        assert!(output.source.is_none());
        assert!(output.response.is_none());
    }

    #[tokio::test]
    async fn test_fetch_empty_url_rejected() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let manager = manager(&db, "offline-v3", FixedNetwork::site()).await;

        let err = fetch_impl(&manager, params("  ", false)).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }

    #[tokio::test]
    async fn test_fetch_navigation_without_fallback_is_network_error() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let manager = manager(&db, "offline-v3", FixedNetwork::default()).await;

        let err = fetch_impl(&manager, params("/", true)).await.unwrap_err();
        assert_eq!(err.code.0, -32008);
    }
}
