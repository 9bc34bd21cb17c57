//! MCP tool implementations.
//!
//! This module contains all tools exposed by the havn server. Worker tools
//! drive the cache manager; cache tools inspect the store directly.

pub mod cache;
pub mod sw_activate;
pub mod sw_fetch;
pub mod sw_install;
pub mod sw_status;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use havn_core::Error;

/// Pretty-printed JSON tool result.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json =
        serde_json::to_string_pretty(output).map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
