use anyhow::{anyhow, Result};
use serde_json::{json, Value};
use std::collections::HashSet;

use super::base::{ProviderResponse, StopReason, Usage};
use crate::models::content::{Content, ImageContent};
use crate::models::message::{Message, MessageContent};
use crate::models::tool::{Tool, ToolCall};

/// Convert internal Message format to Anthropic's messages specification
///
/// The api requires user and assistant turns to alternate, while the orchestrator records
/// every tool result as its own user turn. Consecutive turns with the same role are merged
/// into a single api message, preserving block order.
pub fn messages_to_anthropic_spec(messages: &[Message]) -> Vec<Value> {
    let mut spec: Vec<Value> = Vec::new();

    for message in messages {
        let blocks: Vec<Value> = message
            .content
            .iter()
            .filter_map(content_to_anthropic_block)
            .collect();
        if blocks.is_empty() {
            continue;
        }

        let role = message.role.as_str();
        if let Some(last) = spec.last_mut() {
            if last["role"] == role {
                if let Some(existing) = last["content"].as_array_mut() {
                    existing.extend(blocks);
                    continue;
                }
            }
        }

        spec.push(json!({
            "role": role,
            "content": blocks,
        }));
    }

    spec
}

fn content_to_anthropic_block(content: &MessageContent) -> Option<Value> {
    match content {
        MessageContent::Text(text) => {
            // The api rejects empty text blocks
            if text.text.is_empty() {
                None
            } else {
                Some(json!({"type": "text", "text": text.text}))
            }
        }
        MessageContent::ToolRequest(request) => {
            let input = match &request.tool_call.arguments {
                Value::Null => json!({}),
                other => other.clone(),
            };
            Some(json!({
                "type": "tool_use",
                "id": request.id,
                "name": request.tool_call.name,
                "input": input,
            }))
        }
        MessageContent::ToolResponse(response) => match &response.tool_result {
            Ok(contents) => {
                let mut block = json!({
                    "type": "tool_result",
                    "tool_use_id": response.id,
                });
                if !contents.is_empty() {
                    let parts: Vec<Value> = contents.iter().map(tool_content_block).collect();
                    block["content"] = json!(parts);
                }
                Some(block)
            }
            // A tool error is shown as output so the model can interpret the error message
            Err(e) => Some(json!({
                "type": "tool_result",
                "tool_use_id": response.id,
                "content": e.to_string(),
                "is_error": true,
            })),
        },
    }
}

fn tool_content_block(content: &Content) -> Value {
    match content {
        Content::Text(text) => json!({"type": "text", "text": text.text}),
        Content::Image(image) => convert_image(image),
    }
}

/// Convert an image content into an anthropic image block
pub fn convert_image(image: &ImageContent) -> Value {
    json!({
        "type": "image",
        "source": {
            "type": "base64",
            "media_type": image.mime_type,
            "data": image.data,
        }
    })
}

/// Convert internal Tool format to Anthropic's tool specification
pub fn tools_to_anthropic_spec(tools: &[Tool]) -> Result<Vec<Value>> {
    let mut tool_names = HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(anyhow!("Duplicate tool name: {}", tool.name));
        }

        result.push(json!({
            "name": tool.name,
            "description": tool.description,
            "input_schema": tool.input_schema,
        }));
    }

    Ok(result)
}

/// Convert Anthropic's messages response to internal format
pub fn anthropic_response_to_message(response: &Value) -> Result<ProviderResponse> {
    let blocks = response
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("Invalid response format from Anthropic API: missing content"))?;

    let mut message = Message::assistant();
    for block in blocks {
        match block.get("type").and_then(Value::as_str) {
            Some("text") => {
                let text = block.get("text").and_then(Value::as_str).unwrap_or_default();
                message = message.with_text(text);
            }
            Some("tool_use") => {
                let id = block
                    .get("id")
                    .and_then(Value::as_str)
                    .ok_or_else(|| anyhow!("tool_use block without an id"))?;
                let name = block
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| anyhow!("tool_use block {} without a name", id))?;
                let input = block.get("input").cloned().unwrap_or_else(|| json!({}));
                message = message.with_tool_request(id, ToolCall::new(name, input));
            }
            other => {
                tracing::debug!(block_type = ?other, "Skipping unsupported content block");
            }
        }
    }

    let stop_reason = response
        .get("stop_reason")
        .and_then(Value::as_str)
        .map(StopReason::from)
        .unwrap_or_else(|| StopReason::Other("unknown".to_string()));

    Ok(ProviderResponse {
        message,
        stop_reason,
        usage: get_usage(response),
    })
}

pub fn get_usage(response: &Value) -> Usage {
    let usage = &response["usage"];
    let input_tokens = usage
        .get("input_tokens")
        .and_then(Value::as_i64)
        .map(|v| v as i32);
    let output_tokens = usage
        .get("output_tokens")
        .and_then(Value::as_i64)
        .map(|v| v as i32);
    let total_tokens = match (input_tokens, output_tokens) {
        (Some(input), Some(output)) => Some(input + output),
        _ => None,
    };
    Usage::new(input_tokens, output_tokens, total_tokens)
}
