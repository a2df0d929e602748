use anyhow::{Context, Result};
use async_trait::async_trait;
use rmcp::model::CallToolRequestParam;
use rmcp::service::{RoleClient, RunningService, ServiceError, ServiceExt};
use rmcp::transport::StreamableHttpClientTransport;
use serde_json::Value;

use super::types::{McpTool, ServerDetails, ToolCallOutcome};
use crate::errors::{ToolError, ToolResult};
use crate::models::content::Content;
use crate::models::tool::{Tool, ToolCall};
use crate::tools::ToolServer;

type ClientService = RunningService<RoleClient, ()>;

/// An initialized MCP session with one remote server over streamable HTTP
pub struct McpToolServer {
    name: String,
    url: String,
    service: ClientService,
    details: ServerDetails,
}

impl McpToolServer {
    /// Open the transport and complete the initialization handshake
    pub async fn connect(url: &str) -> Result<Self> {
        let transport = StreamableHttpClientTransport::from_uri(url.to_string());
        let service = ()
            .serve(transport)
            .await
            .with_context(|| format!("failed to connect to MCP server at {url}"))?;

        let details = serde_json::to_value(service.peer_info())
            .map(|info| ServerDetails::from_initialize_result(&info))
            .unwrap_or_default();
        let name = details
            .name
            .clone()
            .unwrap_or_else(|| url.to_string());

        tracing::info!(
            server = %name,
            version = ?details.version,
            protocol_version = ?details.protocol_version,
            "Connected to MCP server"
        );

        Ok(Self {
            name,
            url: url.to_string(),
            service,
            details,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn details(&self) -> &ServerDetails {
        &self.details
    }

    /// End the session. Failures are logged and otherwise ignored.
    pub async fn close(self) {
        match self.service.cancel().await {
            Ok(reason) => tracing::debug!(server = %self.name, ?reason, "MCP session closed"),
            Err(e) => tracing::warn!(server = %self.name, error = %e, "Failed to close MCP session"),
        }
    }
}

fn service_error(tool: &str, error: ServiceError) -> ToolError {
    match error {
        // The server answered with a JSON-RPC error, e.g. an unknown tool
        ServiceError::McpError(data) => {
            ToolError::ExecutionError(format!("{}: {}", tool, data.message))
        }
        other => ToolError::Transport(other.to_string()),
    }
}

#[async_trait]
impl ToolServer for McpToolServer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> Result<Vec<Tool>> {
        let listed = self
            .service
            .list_all_tools()
            .await
            .with_context(|| format!("tools/list failed for MCP server '{}'", self.name))?;

        let tools = listed
            .iter()
            .map(|tool| {
                let raw = serde_json::to_value(tool)?;
                Ok(serde_json::from_value::<McpTool>(raw)?.into_tool())
            })
            .collect::<Result<Vec<Tool>>>()?;

        tracing::debug!(server = %self.name, count = tools.len(), "Listed tools");
        Ok(tools)
    }

    async fn call_tool(&self, tool_call: ToolCall) -> ToolResult<Vec<Content>> {
        let arguments = match tool_call.arguments {
            Value::Object(map) => Some(map),
            Value::Null => None,
            other => {
                return Err(ToolError::InvalidParameters(format!(
                    "arguments for {} must be an object, got {}",
                    tool_call.name, other
                )))
            }
        };

        let result = self
            .service
            .call_tool(CallToolRequestParam {
                name: tool_call.name.clone().into(),
                arguments,
            })
            .await
            .map_err(|e| service_error(&tool_call.name, e))?;

        let raw = serde_json::to_value(&result)
            .map_err(|e| ToolError::ExecutionError(e.to_string()))?;
        let outcome: ToolCallOutcome = serde_json::from_value(raw)
            .map_err(|e| ToolError::ExecutionError(e.to_string()))?;

        tracing::debug!(
            server = %self.name,
            tool = %tool_call.name,
            is_error = outcome.is_error.unwrap_or(false),
            "Tool call completed"
        );
        outcome.into_result()
    }
}
