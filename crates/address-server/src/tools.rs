use chrono::format::{Item, StrftimeItems};
use chrono::Local;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt::Write;

use crate::rpc::{RpcError, INVALID_PARAMS};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Block {
    Text { text: String },
}

/// The result of `tools/call`. Tool failures are reported here with `is_error` set,
/// protocol failures are JSON-RPC errors instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    pub content: Vec<Block>,
    pub is_error: bool,
}

impl CallToolResult {
    fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Block::Text { text: text.into() }],
            is_error: false,
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![Block::Text { text: text.into() }],
            is_error: true,
        }
    }
}

pub fn list() -> Value {
    json!([
        {
            "name": "remote_address_lookup",
            "description": "Find an address by his zip code",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "zip_code": {
                        "type": "string",
                        "description": "The zip code to be searched"
                    }
                },
                "required": ["zip_code"]
            }
        },
        {
            "name": "time",
            "description": "Returns the current time in the specified format",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "format": {
                        "type": "string",
                        "description": "The time format to use, as a strftime string. Defaults to RFC 3339."
                    }
                }
            }
        }
    ])
}

pub fn call(name: &str, arguments: &Value) -> Result<CallToolResult, RpcError> {
    match name {
        "remote_address_lookup" => Ok(address_lookup(arguments)),
        "time" => Ok(time(arguments)),
        other => Err(RpcError::new(INVALID_PARAMS, format!("Unknown tool: {other}"))),
    }
}

fn address_lookup(arguments: &Value) -> CallToolResult {
    match arguments.get("zip_code").and_then(Value::as_str) {
        Some(zip) if !zip.trim().is_empty() => CallToolResult::text(format!(
            "Address found for zip code {zip}: 5954A Bartonsville Road, Fakeville, NY {zip}, USA"
        )),
        _ => CallToolResult::error("zip_code is required"),
    }
}

fn time(arguments: &Value) -> CallToolResult {
    let now = Local::now();
    let format = match arguments.get("format").and_then(Value::as_str) {
        Some(format) if !format.is_empty() => format,
        _ => return CallToolResult::text(now.to_rfc3339()),
    };

    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return CallToolResult::error(format!("Invalid time format: {format}"));
    }

    let mut formatted = String::new();
    match write!(formatted, "{}", now.format(format)) {
        Ok(()) => CallToolResult::text(formatted),
        Err(_) => CallToolResult::error(format!("Invalid time format: {format}")),
    }
}
