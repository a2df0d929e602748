use bat::WrappingMode;
use console::style;
use serde_json::Value;

use toolrelay::mcp::types::ServerDetails;
use toolrelay::models::content::Content;
use toolrelay::models::message::{Message, MessageContent, ToolRequest, ToolResponse};
use toolrelay::models::tool::Tool;
use toolrelay::orchestrator::ExchangeEvent;

const THEME: &str = "zenburn";
const MAX_STRING_LENGTH: usize = 40;
const INDENT: &str = "    ";

fn pretty_print(content: &str, language: &str) {
    let printed = bat::PrettyPrinter::new()
        .input(bat::Input::from_bytes(content.as_bytes()))
        .theme(THEME)
        .language(language)
        .wrapping_mode(WrappingMode::Character)
        .print();
    if let Err(e) = printed {
        tracing::debug!(error = %e, "Falling back to plain output");
        println!("{}", content);
    }
}

pub fn print_markdown(content: &str) {
    pretty_print(content, "Markdown");
}

pub fn print_json(value: &Value) {
    let text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    pretty_print(&text, "JSON");
    println!();
}

pub fn print_error(context: &str, error: impl std::fmt::Display) {
    eprintln!("{} {}: {}", style("✗").red(), context, error);
}

/// Print a progress event as the exchange unfolds
pub fn render_event(event: &ExchangeEvent) {
    match event {
        ExchangeEvent::Assistant { message, .. } => render_message(message),
        ExchangeEvent::ToolResult(message) => render_message(message),
        ExchangeEvent::LimitReached { rounds } => {
            println!(
                "{}",
                style(format!(
                    "Stopped after {rounds} tool rounds; the model still wanted more."
                ))
                .yellow()
            );
        }
    }
}

pub fn render_message(message: &Message) {
    for content in &message.content {
        match content {
            MessageContent::Text(text) if !text.text.trim().is_empty() => {
                print_markdown(&text.text);
                println!();
            }
            MessageContent::Text(_) => {}
            MessageContent::ToolRequest(request) => render_tool_request(request),
            MessageContent::ToolResponse(response) => render_tool_response(response),
        }
    }
}

pub fn render_tool_request(request: &ToolRequest) {
    println!(
        "─── {} | {} ──────────────────────────",
        style(&request.tool_call.name),
        style(&request.id).magenta().dim(),
    );
    print_params(&request.tool_call.arguments, 0);
    println!();
}

pub fn render_tool_response(response: &ToolResponse) {
    match &response.tool_result {
        Ok(contents) => render_contents(contents),
        Err(e) => println!("{} {}", style("error:").red(), e),
    }
    println!();
}

pub fn render_contents(contents: &[Content]) {
    for content in contents {
        match content {
            Content::Text(text) => println!("{}", style(&text.text).dim()),
            Content::Image(image) => println!(
                "{}",
                style(format!("[image: {}, {} bytes base64]", image.mime_type, image.data.len()))
                    .dim()
            ),
        }
    }
}

pub fn render_server(details: &ServerDetails, url: &str) {
    println!(
        "{} {} {}",
        style("Connected to").dim(),
        style(details.display_name()).cyan().bold(),
        style(format!("({url})")).dim()
    );
    if let Some(protocol) = &details.protocol_version {
        println!("{} {}", style("protocol:").dim(), protocol);
    }
    if let Some(instructions) = &details.instructions {
        println!("{} {}", style("instructions:").dim(), instructions);
    }
}

/// List tools with their parameters; `with_schema` prints the full input schema too
pub fn render_tools(tools: &[Tool], with_schema: bool) {
    if tools.is_empty() {
        println!("{}", style("The server exposes no tools.").yellow());
        return;
    }

    println!("Found {} tools:", tools.len());
    for (i, tool) in tools.iter().enumerate() {
        println!("  {}. {}", i + 1, style(&tool.name).green().bold());
        if !tool.description.is_empty() {
            println!("     {}", tool.description);
        }
        if let Some(properties) = tool.input_schema["properties"].as_object() {
            let params: Vec<&str> = properties.keys().map(String::as_str).collect();
            println!("     {} {}", style("parameters:").dim(), params.join(", "));
        }
        if let Some(required) = tool.input_schema["required"].as_array() {
            let required: Vec<&str> = required.iter().filter_map(Value::as_str).collect();
            println!("     {} {}", style("required:").dim(), required.join(", "));
        }
        if with_schema {
            print_json(&tool.input_schema);
        }
    }
    println!();
}

/// Format and print parameters recursively with proper indentation and colors
pub fn print_params(value: &Value, depth: usize) {
    let indent = INDENT.repeat(depth);

    match value {
        Value::Object(map) => {
            for (key, val) in map {
                match val {
                    Value::Object(_) => {
                        println!("{}{}:", indent, style(key).dim());
                        print_params(val, depth + 1);
                    }
                    Value::Array(arr) => {
                        println!("{}{}:", indent, style(key).dim());
                        for item in arr.iter() {
                            println!("{}{}- ", indent, INDENT);
                            print_params(item, depth + 2);
                        }
                    }
                    Value::String(s) => {
                        if s.len() > MAX_STRING_LENGTH {
                            println!("{}{}: {}", indent, style(key).dim(), style("...").dim());
                        } else {
                            println!("{}{}: {}", indent, style(key).dim(), style(s).green());
                        }
                    }
                    Value::Number(n) => {
                        println!("{}{}: {}", indent, style(key).dim(), style(n).blue());
                    }
                    Value::Bool(b) => {
                        println!("{}{}: {}", indent, style(key).dim(), style(b).blue());
                    }
                    Value::Null => {
                        println!("{}{}: {}", indent, style(key).dim(), style("null").dim());
                    }
                }
            }
        }
        Value::Array(arr) => {
            for (i, item) in arr.iter().enumerate() {
                println!("{}{}.", indent, i + 1);
                print_params(item, depth + 1);
            }
        }
        Value::String(s) => println!("{}{}", indent, style(s).green()),
        Value::Number(n) => println!("{}{}", indent, style(n).yellow()),
        Value::Bool(b) => println!("{}{}", indent, style(b).yellow()),
        Value::Null => println!("{}{}", indent, style("null").dim()),
    }
}
