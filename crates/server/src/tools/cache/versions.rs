//! cache_versions tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use havn_core::{CacheDb, CacheStore};

use crate::tools::json_result;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VersionSummary {
    pub version: String,
    pub entries: u64,
    /// Whether this is the version the running manager serves.
    pub current: bool,
}

/// Output from the cache_versions tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheVersionsOutput {
    pub versions: Vec<VersionSummary>,
}

/// Implementation of the cache_versions tool.
pub async fn versions_impl(cache: &CacheDb, current_version: &str) -> Result<CallToolResult, McpError> {
    let mut versions = Vec::new();
    for version in cache.list_versions().await? {
        let entries = cache.entry_count(&version).await?;
        versions.push(VersionSummary { current: version == current_version, version, entries });
    }

    json_result(&CacheVersionsOutput { versions })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{text, url};
    use havn_core::{CachedResponse, RequestKey};

    #[tokio::test]
    async fn test_versions_lists_counts() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        cache.commit_version("offline-v2", Vec::new()).await.unwrap();
        let entry = (RequestKey::get(&url("https://example.com/a")), CachedResponse::new(200, Vec::new(), "a"));
        cache.commit_version("offline-v3", vec![entry]).await.unwrap();

        let result = versions_impl(&cache, "offline-v3").await.unwrap();
        let output: CacheVersionsOutput = serde_json::from_str(&text(&result)).unwrap();

        assert_eq!(output.versions.len(), 2);
        assert_eq!(output.versions[0].version, "offline-v2");
        assert!(!output.versions[0].current);
        assert_eq!(output.versions[1].entries, 1);
        assert!(output.versions[1].current);
    }
}
