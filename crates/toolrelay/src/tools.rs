use anyhow::Result;
use async_trait::async_trait;

use crate::errors::ToolResult;
use crate::models::content::Content;
use crate::models::tool::{Tool, ToolCall};

/// Core trait for anything that can list and invoke tools on behalf of the model
///
/// The orchestrator only ever talks to this trait, so tests can stand in a fake server
/// for the remote MCP session.
#[async_trait]
pub trait ToolServer: Send + Sync {
    /// Name used in logs and rendered output
    fn name(&self) -> &str;

    /// Discover the tools this server exposes
    async fn list_tools(&self) -> Result<Vec<Tool>>;

    /// Invoke a tool. Failures are returned as values, never panics, so they can be
    /// relayed to the model.
    async fn call_tool(&self, tool_call: ToolCall) -> ToolResult<Vec<Content>>;
}
