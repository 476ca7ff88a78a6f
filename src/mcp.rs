//! MCP JSON-RPC protocol bridge.
//!
//! Adapts the operation catalog and [`Dispatcher`] into an MCP
//! Streamable HTTP endpoint that Cursor, Claude, and other MCP clients
//! can connect to using the standard JSON-RPC protocol. Every catalog
//! operation is exposed as an MCP tool via `list_tools` / `call_tool`.

use std::borrow::Cow;
use std::sync::Arc;

use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler};

use crate::catalog::{self, OpSpec};
use crate::dispatch::Dispatcher;
use crate::error::Envelope;

/// Bridges the dispatcher to the MCP JSON-RPC protocol.
///
/// Each MCP session receives a clone of this struct (the dispatcher is
/// behind `Arc`), so all sessions share the same registry and catalog.
#[derive(Clone)]
pub struct McpBridge {
    dispatcher: Arc<Dispatcher>,
}

impl McpBridge {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Convert a catalog entry into an rmcp `Tool` descriptor.
    fn to_mcp_tool(spec: &OpSpec) -> Tool {
        let schema_value = catalog::schema_for(spec);
        let input_schema: Arc<serde_json::Map<String, serde_json::Value>> = match schema_value {
            serde_json::Value::Object(map) => Arc::new(map),
            _ => Arc::new(serde_json::Map::new()),
        };

        Tool {
            name: Cow::Borrowed(spec.name),
            title: None,
            description: Some(Cow::Borrowed(spec.description)),
            input_schema,
            output_schema: None,
            annotations: None,
            execution: None,
            icons: None,
            meta: None,
        }
    }
}

impl ServerHandler for McpBridge {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "opensearch-mcp".to_string(),
                title: Some("OpenSearch MCP".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "OpenSearch MCP — search, document, index, cluster, and security \
                 operations against one or more OpenSearch/Elasticsearch clusters. \
                 Use list_clusters to discover the registered clusters, then pass \
                 the optional `cluster` argument to target a specific one; calls \
                 without it go to the default cluster."
                    .to_string(),
            ),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let tools: Vec<Tool> = catalog::all().iter().map(Self::to_mcp_tool).collect();
        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }

    fn get_tool(&self, name: &str) -> Option<Tool> {
        catalog::find(name).map(Self::to_mcp_tool)
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        if catalog::find(&request.name).is_none() {
            return Err(McpError::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("no operation registered with name: {}", request.name),
                None,
            ));
        }

        let arguments = request
            .arguments
            .map(serde_json::Value::Object)
            .unwrap_or(serde_json::Value::Object(serde_json::Map::new()));

        match self.dispatcher.dispatch(&request.name, arguments).await {
            Envelope::Ok { result } => {
                let text = serde_json::to_string_pretty(&result).unwrap_or_default();
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Envelope::Error { code, message } => {
                let body = serde_json::json!({ "code": code, "message": message });
                let text = serde_json::to_string_pretty(&body).unwrap_or_default();
                Ok(CallToolResult::error(vec![Content::text(text)]))
            }
        }
    }
}
