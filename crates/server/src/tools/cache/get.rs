//! cache_get tool implementation.
//!
//! Retrieves one stored response by version and request.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use havn_client::fetch::resolve;
use havn_core::{CacheDb, CacheStore, Error, MatchOptions, RequestKey};

use crate::tools::json_result;
use crate::tools::sw_fetch::ResponseOutput;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Absolute URL, or a path relative to the site origin.
    pub url: String,

    /// Version tag to read from (default: the running version).
    #[serde(default)]
    pub version: Option<String>,

    /// HTTP method of the stored request (default: GET).
    #[serde(default)]
    pub method: Option<String>,

    /// Match without the query string.
    #[serde(default)]
    pub ignore_query: bool,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub version: String,
    pub method: String,
    pub url: String,
    pub stored_at: String,
    pub response: ResponseOutput,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(
    cache: &CacheDb, origin: &Url, current_version: &str, params: CacheGetParams,
) -> Result<CallToolResult, McpError> {
    let url = resolve(origin, &params.url).map_err(|e| Error::InvalidUrl(format!("{}: {e}", params.url)))?;
    let key = RequestKey::new(params.method.as_deref().unwrap_or("GET"), &url);
    let version = params.version.unwrap_or_else(|| current_version.to_string());
    let options = MatchOptions { ignore_query: params.ignore_query };

    let entry = cache
        .get(&version, &key, options)
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("{version}: {key}")))?;

    let output = CacheGetOutput {
        version,
        method: entry.key.method().to_string(),
        url: entry.key.url().to_string(),
        stored_at: entry.stored_at,
        response: entry.response.into(),
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{text, url};
    use havn_core::CachedResponse;

    fn params(url: &str) -> CacheGetParams {
        CacheGetParams { url: url.into(), version: None, method: None, ignore_query: false }
    }

    async fn seeded() -> CacheDb {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let key = RequestKey::get(&url("https://example.com/offline.html"));
        let response = CachedResponse::new(200, vec![("content-type".into(), "text/html".into())], "offline");
        cache.commit_version("offline-v3", vec![(key, response)]).await.unwrap();
        cache
    }

    #[tokio::test]
    async fn test_get_impl_missing() {
        let cache = seeded().await;
        let result = get_impl(&cache, &url("https://example.com"), "offline-v3", params("/nope.html")).await;
        assert_eq!(result.unwrap_err().code.0, -32001);
    }

    #[tokio::test]
    async fn test_get_impl_found() {
        let cache = seeded().await;

        let result = get_impl(&cache, &url("https://example.com"), "offline-v3", params("offline.html"))
            .await
            .unwrap();
        let output: CacheGetOutput = serde_json::from_str(&text(&result)).unwrap();

        assert_eq!(output.url, "https://example.com/offline.html");
        assert_eq!(output.response.body.as_deref(), Some("offline"));
    }

    #[tokio::test]
    async fn test_get_impl_other_version_and_query() {
        let cache = seeded().await;

        let mut p = params("/offline.html?utm=1");
        p.ignore_query = true;
        assert!(get_impl(&cache, &url("https://example.com"), "offline-v3", p.clone()).await.is_ok());

        p.version = Some("offline-v2".into());
        assert!(get_impl(&cache, &url("https://example.com"), "offline-v3", p).await.is_err());
    }
}
