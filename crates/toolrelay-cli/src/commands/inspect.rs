use anyhow::{Context, Result};
use console::style;
use serde_json::Value;

use toolrelay::mcp::McpToolServer;
use toolrelay::models::tool::ToolCall;
use toolrelay::tools::ToolServer;

use crate::render;
use crate::session;

/// Print what the server exposes and optionally make one direct tool call
pub async fn run(server_url: &str, call: Option<&str>, args: &str) -> Result<()> {
    let (server, tools) = session::connect(server_url).await?;
    render::render_tools(&tools, true);

    let result = match call {
        Some(name) => call_tool(&server, name, args).await,
        None => Ok(()),
    };

    session::release(server).await;
    result
}

async fn call_tool(server: &McpToolServer, name: &str, args: &str) -> Result<()> {
    let arguments: Value =
        serde_json::from_str(args).with_context(|| format!("--args is not valid JSON: {args}"))?;

    println!("{} {}", style("Calling").dim(), style(name).green().bold());
    render::print_params(&arguments, 1);

    match server.call_tool(ToolCall::new(name, arguments)).await {
        Ok(contents) => {
            println!("{}", style("Result:").green());
            render::render_contents(&contents);
        }
        Err(e) => render::print_error(&format!("Calling {name}"), e),
    }
    Ok(())
}
