use anyhow::Result;
use console::style;

use toolrelay::mcp::McpToolServer;
use toolrelay::models::tool::Tool;
use toolrelay::orchestrator::Orchestrator;
use toolrelay::providers::anthropic::AnthropicProvider;
use toolrelay::tools::ToolServer;

use crate::render;
use crate::{ExchangeArgs, ModelArgs};

/// Connect to the server and fetch its catalog. The session is closed again if
/// discovery fails.
pub async fn connect(server_url: &str) -> Result<(McpToolServer, Vec<Tool>)> {
    println!("{} {}", style("Connecting to").dim(), server_url);
    let server = McpToolServer::connect(server_url).await?;
    render::render_server(server.details(), server.url());

    match server.list_tools().await {
        Ok(tools) => Ok((server, tools)),
        Err(e) => {
            release(server).await;
            Err(e)
        }
    }
}

/// Close the session; errors are logged by the client and never surface here
pub async fn release(server: McpToolServer) {
    server.close().await;
    println!("{}", style("Connection closed").dim());
}

/// Validate the model settings before any connection is made
pub fn provider(model: &ModelArgs) -> Result<AnthropicProvider> {
    let provider = AnthropicProvider::new(model.provider_config()?)?;
    tracing::debug!(model = provider.model(), "Using Anthropic provider");
    Ok(provider)
}

pub fn orchestrator<'a>(
    provider: AnthropicProvider,
    exchange: &ExchangeArgs,
    server: &'a McpToolServer,
) -> Orchestrator<'a> {
    Orchestrator::new(Box::new(provider), server).with_system_prompt(exchange.system.clone())
}
