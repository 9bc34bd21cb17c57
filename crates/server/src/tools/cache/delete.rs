//! cache_delete_version tool implementation.
//!
//! Drops one stale version by hand. The running version can only be
//! replaced through install and activate.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use havn_core::{CacheDb, CacheStore, Error};

use crate::tools::json_result;

/// Parameters for the cache_delete_version tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheDeleteVersionParams {
    /// Version tag to delete.
    pub version: String,
}

/// Output from the cache_delete_version tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheDeleteVersionOutput {
    pub version: String,
    /// False when the version did not exist.
    pub deleted: bool,
}

/// Implementation of the cache_delete_version tool.
pub async fn delete_version_impl(
    cache: &CacheDb, current_version: &str, params: CacheDeleteVersionParams,
) -> Result<CallToolResult, McpError> {
    let version = params.version.trim();
    if version.is_empty() {
        return Err(Error::InvalidInput("version cannot be empty".into()).into());
    }
    if version == current_version {
        return Err(Error::InvalidInput(format!("{version} is the running version")).into());
    }

    let deleted = cache.delete_version(version).await?;
    tracing::info!(version, deleted, "manual version delete");

    json_result(&CacheDeleteVersionOutput { version: version.to_string(), deleted })
}
