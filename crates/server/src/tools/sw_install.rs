//! sw_install tool implementation.
//!
//! Installs the manager's version, then activates it when skip-waiting is in
//! effect.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use havn_client::{CacheManager, WorkerHooks, WorkerState};

use super::json_result;

/// Input parameters for sw_install tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SwInstallParams {
    /// Activate right after a successful install. Defaults to the configured
    /// `skip_waiting`.
    #[serde(default)]
    pub activate: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InstalledAssetOutput {
    pub path: String,
    pub url: String,
    pub status: u16,
    pub bytes: usize,
}

/// Output structure for sw_install tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwInstallOutput {
    pub version: String,
    pub assets: Vec<InstalledAssetOutput>,
    /// Versions deleted by the follow-up activation, if one ran.
    pub purged: Option<Vec<String>>,
    pub state: String,
}

pub(crate) fn state_name(state: WorkerState) -> String {
    serde_json::to_value(state)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| format!("{state:?}").to_lowercase())
}

/// Implementation of the sw_install tool.
pub async fn install_impl(
    manager: &CacheManager, skip_waiting: bool, params: SwInstallParams,
) -> Result<CallToolResult, McpError> {
    let report = manager.on_install().await?;

    let purged = if params.activate.unwrap_or(skip_waiting) {
        Some(manager.on_activate().await?.purged)
    } else {
        None
    };

    let output = SwInstallOutput {
        version: report.version,
        assets: report
            .assets
            .into_iter()
            .map(|a| InstalledAssetOutput { path: a.path, url: a.url, status: a.status, bytes: a.bytes })
            .collect(),
        purged,
        state: state_name(manager.state().await),
    };

    json_result(&output)
}
