//! sw_activate tool implementation.
//!
//! Activates the manager's version and purges every other one.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use havn_client::{CacheManager, WorkerHooks};

use super::json_result;
use super::sw_install::state_name;

/// Output structure for sw_activate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwActivateOutput {
    pub version: String,
    /// Deleted versions; empty when there was nothing to purge.
    pub purged: Vec<String>,
    pub state: String,
}

/// Implementation of the sw_activate tool.
pub async fn activate_impl(manager: &CacheManager) -> Result<CallToolResult, McpError> {
    let report = manager.on_activate().await?;
    let output = SwActivateOutput { version: report.version, purged: report.purged, state: state_name(manager.state().await) };
    json_result(&output)
}
