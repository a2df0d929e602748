use anyhow::Result;
use console::style;

use toolrelay::models::message::{Message, MessageContent};
use toolrelay::providers::anthropic::AnthropicProvider;
use toolrelay::providers::base::Provider;

use crate::render;
use crate::ModelArgs;

const GREETING: &str =
    "Hello! This is a test of the Anthropic API connection. Please respond with a brief greeting.";

/// Check the model credentials and endpoint with one tool-free request
pub async fn run(model: &ModelArgs) -> Result<()> {
    let provider = AnthropicProvider::new(model.provider_config()?)?;
    println!("{} {}", style("Pinging").dim(), style(provider.model()).cyan());

    let response = provider
        .complete("", &[Message::user().with_text(GREETING)], &[])
        .await?;

    for content in &response.message.content {
        match content {
            MessageContent::Text(text) => render::print_markdown(&text.text),
            MessageContent::ToolRequest(request) => render::render_tool_request(request),
            MessageContent::ToolResponse(response) => render::render_tool_response(response),
        }
    }
    println!();
    println!(
        "{}",
        style(format!(
            "stop_reason: {}, tokens in/out: {}/{}",
            response.stop_reason,
            response.usage.input_tokens.unwrap_or_default(),
            response.usage.output_tokens.unwrap_or_default()
        ))
        .dim()
    );
    Ok(())
}
