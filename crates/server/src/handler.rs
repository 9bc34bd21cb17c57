//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::cache::{CacheDeleteVersionParams, CacheGetParams, delete_version_impl, get_impl, versions_impl};
use crate::tools::sw_activate::activate_impl;
use crate::tools::sw_fetch::{SwFetchParams, fetch_impl};
use crate::tools::sw_install::{SwInstallParams, install_impl};
use crate::tools::sw_status::status_impl;

use havn_client::CacheManager;
use havn_core::CacheDb;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for havn.
#[derive(Clone)]
pub struct HavnServer {
    tool_router: ToolRouter<Self>,
    manager: Arc<CacheManager>,
    db: CacheDb,
    skip_waiting: bool,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl HavnServer {
    /// Create a new server handler around a running cache manager.
    pub fn new(manager: Arc<CacheManager>, db: CacheDb, skip_waiting: bool) -> Self {
        Self { tool_router: Self::tool_router(), manager, db, skip_waiting }
    }

    #[tool(
        description = "Install the configured version: fetch every fallback asset bypassing caches and commit them atomically. Activates afterwards unless activate=false."
    )]
    async fn sw_install(&self, params: Parameters<SwInstallParams>) -> Result<CallToolResult, McpError> {
        install_impl(&self.manager, self.skip_waiting, params.0).await
    }

    #[tool(description = "Activate the configured version and delete every other cache version.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.manager).await
    }

    #[tool(
        description = "Run a request through the interceptor. Navigations are network-first with an offline fallback, fallback assets are cache-first with background refresh, everything else passes through and is fetched directly from the network."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.manager, params.0).await
    }

    #[tool(description = "Report the worker state, configured version, fallback assets and stored versions.")]
    async fn sw_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.manager, &self.db).await
    }

    #[tool(description = "List stored cache versions with their entry counts.")]
    async fn cache_versions(&self) -> Result<CallToolResult, McpError> {
        versions_impl(&self.db, self.manager.version()).await
    }

    #[tool(description = "Read one stored response by URL, optionally from another version or ignoring the query string.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.db, self.manager.classifier().origin(), self.manager.version(), params.0).await
    }

    #[tool(description = "Delete a stale cache version. The running version cannot be deleted.")]
    async fn cache_delete_version(&self, params: Parameters<CacheDeleteVersionParams>) -> Result<CallToolResult, McpError> {
        delete_version_impl(&self.db, self.manager.version(), params.0).await
    }
}

impl ServerHandler for HavnServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "havn".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
