//! sw_status tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use havn_client::CacheManager;
use havn_core::{CacheDb, CacheStore};

use super::json_result;
use super::sw_install::state_name;

/// Output structure for sw_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwStatusOutput {
    pub version: String,
    pub state: String,
    pub origin: String,
    pub fallback_assets: Vec<String>,
    /// Whether the store holds this manager's version.
    pub installed: bool,
    pub entries: u64,
    pub versions: Vec<String>,
}

/// Implementation of the sw_status tool.
pub async fn status_impl(manager: &CacheManager, db: &CacheDb) -> Result<CallToolResult, McpError> {
    let versions = db.list_versions().await?;
    let installed = versions.iter().any(|v| v == manager.version());
    let entries = db.entry_count(manager.version()).await?;

    let output = SwStatusOutput {
        version: manager.version().to_string(),
        state: state_name(manager.state().await),
        origin: manager.classifier().origin().to_string(),
        fallback_assets: manager.fallback().paths().to_vec(),
        installed,
        entries,
        versions,
    };

    json_result(&output)
}
