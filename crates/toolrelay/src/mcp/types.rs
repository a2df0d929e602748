use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::{ToolError, ToolResult};
use crate::models::content::{joined_text, Content};
use crate::models::tool::Tool;

/// A tool definition as it appears in a `tools/list` result
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpTool {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub input_schema: Option<Value>,
}

impl McpTool {
    pub fn into_tool(self) -> Tool {
        let input_schema = self
            .input_schema
            .filter(|schema| !schema.is_null())
            .unwrap_or_else(|| json!({"type": "object", "properties": {}}));
        Tool::new(self.name, self.description.unwrap_or_default(), input_schema)
    }
}

/// The body of a `tools/call` result
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallOutcome {
    #[serde(default)]
    pub content: Vec<Value>,
    #[serde(default)]
    pub is_error: Option<bool>,
}

impl ToolCallOutcome {
    /// Results flagged with `isError` become execution errors carrying their text
    pub fn into_result(self) -> ToolResult<Vec<Content>> {
        let contents: Vec<Content> = self.content.iter().map(content_from_value).collect();
        if self.is_error.unwrap_or(false) {
            let text = joined_text(&contents);
            let message = if text.is_empty() {
                "the tool reported an error".to_string()
            } else {
                text
            };
            return Err(ToolError::ExecutionError(message));
        }
        Ok(contents)
    }
}

/// Map one MCP content block to internal content
///
/// Blocks we do not model (resources, audio) are kept as their JSON text so the model
/// still sees them.
pub fn content_from_value(value: &Value) -> Content {
    match value.get("type").and_then(Value::as_str) {
        Some("text") => Content::text(value["text"].as_str().unwrap_or_default()),
        Some("image") => match (value["data"].as_str(), value["mimeType"].as_str()) {
            (Some(data), Some(mime_type)) => Content::image(data, mime_type),
            _ => Content::text(value.to_string()),
        },
        _ => Content::text(value.to_string()),
    }
}

/// What the server said about itself during initialization
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerDetails {
    pub name: Option<String>,
    pub version: Option<String>,
    pub instructions: Option<String>,
    pub protocol_version: Option<String>,
}

impl ServerDetails {
    /// Read from an `initialize` result; a null value yields empty details
    pub fn from_initialize_result(value: &Value) -> Self {
        let text = |v: &Value| v.as_str().filter(|s| !s.is_empty()).map(String::from);
        Self {
            name: text(&value["serverInfo"]["name"]),
            version: text(&value["serverInfo"]["version"]),
            instructions: text(&value["instructions"]),
            protocol_version: text(&value["protocolVersion"]),
        }
    }

    pub fn display_name(&self) -> String {
        match (&self.name, &self.version) {
            (Some(name), Some(version)) => format!("{name} {version}"),
            (Some(name), None) => name.clone(),
            _ => "unknown server".to_string(),
        }
    }
}
